//! Narrative and illustration engine for Echoes of the Bell.
//!
//! This crate provides:
//! - A turn-based story driven by a chat-completion storyteller
//! - Scene illustrations as bitmaps or validated vector scenes
//! - A persistent illustration cache keyed by scene description
//! - Stale-result protection across turns and restarts
//!
//! # Quick Start
//!
//! ```ignore
//! use echoes_core::{Game, StoryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let game = Game::new(StoryConfig::from_env()).await;
//!
//!     game.start().await;
//!     let state = game.state();
//!     println!("{}", state.history.join("\n\n"));
//!
//!     if let Some(choice) = state.choices.first() {
//!         game.choose(choice).await;
//!     }
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod game;
pub mod illustration;
pub mod json;
pub mod narrative;
mod orchestrator;
pub mod prompts;
pub mod scene;
pub mod state;
pub mod store;
pub mod testing;

// Primary public API
pub use backend::{ChatBackend, Unconfigured};
pub use config::{IllustrationMode, StoryConfig};
pub use error::GenerationError;
pub use game::Game;
pub use illustration::{IllustrationGenerator, Illustrator};
pub use narrative::{NarrativeGenerator, StoryTeller, TurnResult};
pub use orchestrator::{IllustrationStatus, TurnOutcome};
pub use scene::{AttrValue, Illustration, ShapeKind, VectorElement, VectorScene};
pub use state::{GameState, GameStatus};
pub use store::{
    CacheStore, FileRecords, IllustrationCache, MemoryRecords, RecordStore, StorageError,
};
