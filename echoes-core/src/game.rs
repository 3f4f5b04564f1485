//! Game - the primary public API for playing a story.
//!
//! A [`Game`] accepts the three player intents (start, choose, restart),
//! runs turns through the storyteller and illustrator, and publishes every
//! state change on a watch channel that any number of frontends can follow.

use crate::backend::{ChatBackend, Unconfigured};
use crate::config::StoryConfig;
use crate::illustration::{IllustrationGenerator, Illustrator};
use crate::narrative::{NarrativeGenerator, StoryTeller};
use crate::orchestrator::{Orchestrator, TurnOutcome};
use crate::prompts::{action_context, OPENING_PROMPT};
use crate::scene::Illustration;
use crate::state::GameState;
use crate::store::CacheStore;
use openrouter::OpenRouter;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// A running game. Cheap to clone; clones share the same game.
#[derive(Clone)]
pub struct Game {
    orchestrator: Orchestrator,
    state: Arc<watch::Sender<GameState>>,
}

impl Game {
    /// Create a game talking to the configured backends.
    ///
    /// Missing API keys do not fail here. Calls needing them fail through
    /// the normal error channels instead.
    pub async fn new(config: StoryConfig) -> Self {
        let text = backend(
            "CHAT_API_KEY",
            config.chat_api_key.as_deref(),
            &config.text_model,
            &config,
        );
        let image = backend(
            "IMAGE_API_KEY",
            config.image_api_key.as_deref(),
            &config.image_model,
            &config,
        );

        let storyteller = Arc::new(NarrativeGenerator::new(text.clone()));
        let illustrator =
            Arc::new(IllustrationGenerator::new(text, image).with_mode(config.illustration_mode));
        let store = config.cache_store();

        info!(
            text_model = %config.text_model,
            image_model = %config.image_model,
            mode = ?config.illustration_mode,
            cache = ?store.record_path(),
            "Creating game"
        );
        Self::with_parts(storyteller, illustrator, store).await
    }

    /// Create a game from explicit parts.
    ///
    /// The illustration cache is loaded from `store` before returning.
    pub async fn with_parts(
        storyteller: Arc<dyn StoryTeller>,
        illustrator: Arc<dyn Illustrator>,
        store: CacheStore,
    ) -> Self {
        let cache = store.load().await;
        let (sender, _) = watch::channel(GameState::new());
        let state = Arc::new(sender);
        Self {
            orchestrator: Orchestrator::new(storyteller, illustrator, cache, store, state.clone()),
            state,
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> GameState {
        self.state.borrow().clone()
    }

    /// Follow state changes.
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.state.subscribe()
    }

    /// Begin a new story. Only valid on the title screen.
    pub async fn start(&self) -> TurnOutcome {
        let mut turn = None;
        self.state.send_if_modified(|state| {
            if !state.can_start() {
                return false;
            }
            turn = Some(state.begin_start());
            true
        });
        let Some(turn) = turn else {
            debug!("Ignoring start outside the title screen");
            return TurnOutcome::Ignored;
        };

        info!(turn, "Starting a new story");
        self.orchestrator
            .play_turn(turn, OPENING_PROMPT, |state, result| state.finish_start(result))
            .await
    }

    /// Take an action. Only valid while playing and not already waiting
    /// on the storyteller.
    pub async fn choose(&self, action: &str) -> TurnOutcome {
        let action = action.trim();
        if action.is_empty() {
            return TurnOutcome::Ignored;
        }

        let mut pending = None;
        self.state.send_if_modified(|state| {
            if !state.can_choose() {
                return false;
            }
            let context = action_context(&state.history, action);
            pending = Some((state.begin_choice(), context));
            true
        });
        let Some((turn, context)) = pending else {
            debug!(action, "Ignoring choice while not accepting actions");
            return TurnOutcome::Ignored;
        };

        info!(turn, action, "Player chose");
        self.orchestrator
            .play_turn(turn, &context, |state, result| {
                state.finish_choice(action, result)
            })
            .await
    }

    /// Return to the title screen from any state.
    ///
    /// The illustration cache survives. Work still in flight for the old
    /// playthrough is discarded when it completes.
    pub fn restart(&self) {
        self.state.send_modify(GameState::reset);
        info!(turn = self.state.borrow().turn, "Restarted");
    }

    /// The cached illustration for a scene description, if any.
    pub async fn cached_illustration(&self, scene: &str) -> Option<Illustration> {
        self.orchestrator.cache().lock().await.get(scene).cloned()
    }

    /// Number of cached illustrations.
    pub async fn cached_illustrations(&self) -> usize {
        self.orchestrator.cache().lock().await.len()
    }

    /// Forget every cached illustration, in memory and on disk.
    pub async fn clear_illustration_cache(&self) {
        let mut cache = self.orchestrator.cache().lock().await;
        let dropped = cache.len();
        cache.clear();
        self.orchestrator.store().save(&cache).await;
        info!(dropped, "Cleared illustration cache");
    }
}

fn backend(
    var: &str,
    key: Option<&str>,
    model: &str,
    config: &StoryConfig,
) -> Arc<dyn ChatBackend> {
    match key {
        Some(key) => Arc::new(
            OpenRouter::new(key)
                .with_model(model)
                .with_app(&config.app_referer, &config.app_title),
        ),
        None => {
            warn!("{var} is not set; calls needing it will fail");
            Arc::new(Unconfigured)
        }
    }
}
