//! Turn orchestration.
//!
//! A turn runs in two phases. The narrative phase awaits the storyteller
//! and commits its result. The illustration phase then either installs a
//! cached picture or spawns a background task to draw one, so a slow or
//! failing illustrator never holds up the next choice.
//!
//! Narrative commits are guarded by the turn identity taken when the turn
//! began. Illustration writes are guarded by the scene identity the commit
//! produced, so a pending or failed choice leaves the picture on screen alone.

use crate::error::GenerationError;
use crate::illustration::Illustrator;
use crate::narrative::{StoryTeller, TurnResult};
use crate::state::{GameState, StepCommit};
use crate::store::{CacheStore, IllustrationCache};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// How a turn request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The request was not valid in the current state.
    Ignored,
    /// A restart or newer turn superseded this one before it finished.
    Superseded,
    /// The storyteller failed; the narrative error channel is set.
    Failed(GenerationError),
    /// The game ended.
    Ended,
    /// The story advanced.
    Advanced(IllustrationStatus),
}

/// What happened to the illustration slot after a turn advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllustrationStatus {
    /// No scene description; the slot was cleared.
    Cleared,
    /// Served from the cache.
    Cached,
    /// Generation is running in the background.
    Pending,
    /// A newer scene took over before the illustration phase.
    Skipped,
}

/// The turn pipeline and everything it shares with spawned tasks.
#[derive(Clone)]
pub(crate) struct Orchestrator {
    storyteller: Arc<dyn StoryTeller>,
    illustrator: Arc<dyn Illustrator>,
    cache: Arc<Mutex<IllustrationCache>>,
    store: CacheStore,
    state: Arc<watch::Sender<GameState>>,
}

impl Orchestrator {
    pub(crate) fn new(
        storyteller: Arc<dyn StoryTeller>,
        illustrator: Arc<dyn Illustrator>,
        cache: IllustrationCache,
        store: CacheStore,
        state: Arc<watch::Sender<GameState>>,
    ) -> Self {
        Self {
            storyteller,
            illustrator,
            cache: Arc::new(Mutex::new(cache)),
            store,
            state,
        }
    }

    pub(crate) fn cache(&self) -> &Arc<Mutex<IllustrationCache>> {
        &self.cache
    }

    pub(crate) fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Run one turn. `commit` applies the narrative result to the state
    /// and is only called if `turn` is still current.
    pub(crate) async fn play_turn<F>(&self, turn: u64, context: &str, commit: F) -> TurnOutcome
    where
        F: FnOnce(&mut GameState, Result<TurnResult, GenerationError>) -> StepCommit,
    {
        let result = self.storyteller.next_step(context).await;

        let mut committed = None;
        self.state.send_if_modified(|state| {
            if state.turn != turn {
                return false;
            }
            committed = Some((commit(state, result), state.scene));
            true
        });

        match committed {
            None => {
                debug!(turn, "Discarding narrative result from a superseded turn");
                TurnOutcome::Superseded
            }
            Some((StepCommit::Failed(e), _)) => TurnOutcome::Failed(e),
            Some((StepCommit::Ended, _)) => {
                info!(turn, "Story reached its ending");
                TurnOutcome::Ended
            }
            Some((StepCommit::Continued(description), scene)) => {
                TurnOutcome::Advanced(self.illustrate(scene, description).await)
            }
        }
    }

    async fn illustrate(&self, scene: u64, description: String) -> IllustrationStatus {
        if description.is_empty() {
            self.state.send_if_modified(|state| state.clear_illustration(scene));
            return IllustrationStatus::Cleared;
        }

        let cached = self.cache.lock().await.get(&description).cloned();
        if let Some(illustration) = cached {
            debug!(scene, description = %description, "Illustration cache hit");
            return if self
                .state
                .send_if_modified(|state| state.install_illustration(scene, illustration))
            {
                IllustrationStatus::Cached
            } else {
                IllustrationStatus::Skipped
            };
        }

        if !self.state.send_if_modified(|state| state.begin_illustration(scene)) {
            return IllustrationStatus::Skipped;
        }

        debug!(scene, description = %description, "Illustration cache miss, generating");
        let this = self.clone();
        tokio::spawn(async move { this.draw(scene, description).await });
        IllustrationStatus::Pending
    }

    async fn draw(&self, scene: u64, description: String) {
        let result = self.illustrator.scene_image(&description).await;

        // Successful drawings are kept even when the scene has moved on.
        if let Ok(ref illustration) = result {
            let mut cache = self.cache.lock().await;
            cache.insert(description.clone(), illustration.clone());
            self.store.save(&cache).await;
        }

        if let Err(ref e) = result {
            warn!(scene, description = %description, error = %e, "Scene illustration failed");
        }

        if !self
            .state
            .send_if_modified(|state| state.finish_illustration(scene, result))
        {
            debug!(
                scene,
                description = %description,
                "Discarding illustration of a replaced scene"
            );
        }
    }
}
