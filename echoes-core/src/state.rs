//! Game state and its transitions.
//!
//! Two identities guard late results. Narrative results carry the turn
//! they were requested for and are dropped once a newer turn or restart
//! has begun. Illustration results carry the scene they depict and are
//! dropped once a different scene is on screen. A choice that is still
//! being written, or that fails, leaves the current scene in place.

use crate::error::GenerationError;
use crate::narrative::TurnResult;
use crate::prompts::action_marker;
use crate::scene::Illustration;

/// Top-level screen of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameStatus {
    #[default]
    Title,
    Playing,
    GameOver,
}

/// Everything the presentation layer needs to draw the game.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameState {
    pub status: GameStatus,

    /// Narration and `> action` echoes, oldest first.
    pub history: Vec<String>,

    /// Actions offered for the current turn.
    pub choices: Vec<String>,

    pub illustration: Option<Illustration>,

    pub narrative_loading: bool,
    pub illustration_loading: bool,

    pub narrative_error: Option<GenerationError>,
    pub illustration_error: Option<GenerationError>,

    /// Closing message once the game has ended.
    pub game_over_message: String,

    /// Identity of the latest turn. Bumped by every start, choice and restart.
    pub turn: u64,

    /// Identity of the scene on screen. Bumped when a narrative result is
    /// committed and on restart.
    pub scene: u64,
}

/// What a narrative result did to the state.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StepCommit {
    /// The narrative call failed; the error channel is set.
    Failed(GenerationError),
    /// The game ended.
    Ended,
    /// Play continues; the scene description still needs illustrating.
    Continued(String),
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a start intent would be accepted.
    pub fn can_start(&self) -> bool {
        self.status == GameStatus::Title && !self.narrative_loading
    }

    /// Whether a choice intent would be accepted.
    pub fn can_choose(&self) -> bool {
        self.status == GameStatus::Playing && !self.narrative_loading
    }

    fn next_turn(&mut self) -> u64 {
        self.turn += 1;
        self.turn
    }

    fn next_scene(&mut self) {
        self.scene += 1;
    }

    pub(crate) fn begin_start(&mut self) -> u64 {
        self.history.clear();
        self.choices.clear();
        self.illustration = None;
        self.illustration_loading = false;
        self.narrative_error = None;
        self.illustration_error = None;
        self.game_over_message.clear();
        self.narrative_loading = true;
        self.next_turn()
    }

    pub(crate) fn begin_choice(&mut self) -> u64 {
        self.narrative_error = None;
        self.narrative_loading = true;
        self.next_turn()
    }

    pub(crate) fn finish_start(
        &mut self,
        result: Result<TurnResult, GenerationError>,
    ) -> StepCommit {
        self.narrative_loading = false;
        match result {
            Err(e) => {
                self.narrative_error = Some(e.clone());
                StepCommit::Failed(e)
            }
            Ok(step) => {
                self.history = vec![step.story];
                self.choices = step.choices;
                self.status = GameStatus::Playing;
                self.next_scene();
                StepCommit::Continued(step.scene_description)
            }
        }
    }

    pub(crate) fn finish_choice(
        &mut self,
        action: &str,
        result: Result<TurnResult, GenerationError>,
    ) -> StepCommit {
        self.narrative_loading = false;
        match result {
            Err(e) => {
                self.narrative_error = Some(e.clone());
                StepCommit::Failed(e)
            }
            Ok(step) if step.game_over => {
                self.game_over_message = step.game_over_message;
                self.status = GameStatus::GameOver;
                self.illustration = None;
                self.illustration_loading = false;
                self.next_scene();
                StepCommit::Ended
            }
            Ok(step) => {
                self.history.push(action_marker(action));
                self.history.push(step.story);
                self.choices = step.choices;
                self.next_scene();
                StepCommit::Continued(step.scene_description)
            }
        }
    }

    pub(crate) fn install_illustration(&mut self, scene: u64, illustration: Illustration) -> bool {
        if scene != self.scene {
            return false;
        }
        self.illustration = Some(illustration);
        self.illustration_loading = false;
        self.illustration_error = None;
        true
    }

    pub(crate) fn clear_illustration(&mut self, scene: u64) -> bool {
        if scene != self.scene {
            return false;
        }
        self.illustration = None;
        self.illustration_loading = false;
        true
    }

    pub(crate) fn begin_illustration(&mut self, scene: u64) -> bool {
        if scene != self.scene {
            return false;
        }
        self.illustration = None;
        self.illustration_loading = true;
        self.illustration_error = None;
        true
    }

    pub(crate) fn finish_illustration(
        &mut self,
        scene: u64,
        result: Result<Illustration, GenerationError>,
    ) -> bool {
        if scene != self.scene {
            return false;
        }
        self.illustration_loading = false;
        match result {
            Ok(illustration) => self.illustration = Some(illustration),
            Err(e) => {
                self.illustration = None;
                self.illustration_error = Some(e);
            }
        }
        true
    }

    /// Back to the title screen. Both identities keep counting.
    pub(crate) fn reset(&mut self) {
        *self = Self {
            turn: self.turn + 1,
            scene: self.scene + 1,
            ..Self::default()
        };
    }
}
