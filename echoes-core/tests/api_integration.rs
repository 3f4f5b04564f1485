//! Integration tests that call the real OpenRouter API.
//!
//! These tests require CHAT_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p echoes-core --test api_integration -- --ignored`
//!
//! They are marked #[ignore] so CI never pays for API calls.

use echoes_core::{
    Game, GameStatus, IllustrationGenerator, IllustrationMode, Illustrator, NarrativeGenerator,
    StoryConfig, StoryTeller, TurnOutcome,
};
use openrouter::OpenRouter;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if API key is available
fn has_api_key() -> bool {
    std::env::var("CHAT_API_KEY").is_ok()
}

fn client() -> Arc<OpenRouter> {
    let config = StoryConfig::from_env();
    Arc::new(
        OpenRouter::from_env("CHAT_API_KEY")
            .expect("CHAT_API_KEY should be set")
            .with_model(config.text_model),
    )
}

#[tokio::test]
#[ignore] // Run with: cargo test -p echoes-core --test api_integration -- --ignored
async fn test_storyteller_opening() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: CHAT_API_KEY not set");
        return;
    }

    let storyteller = NarrativeGenerator::new(client());
    let step = storyteller
        .next_step(echoes_core::prompts::OPENING_PROMPT)
        .await
        .expect("storyteller should respond");

    println!("{}\n{:?}\n{}", step.story, step.choices, step.scene_description);
    assert!(!step.story.is_empty());
    assert!(!step.choices.is_empty());
    assert!(!step.game_over);
}

#[tokio::test]
#[ignore]
async fn test_vector_scene() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: CHAT_API_KEY not set");
        return;
    }

    let backend = client();
    let illustrator =
        IllustrationGenerator::new(backend.clone(), backend).with_mode(IllustrationMode::Vector);
    let illustration = illustrator
        .scene_image("A girl at rusted school gates at dusk")
        .await
        .expect("illustrator should respond");

    let scene = illustration.as_vector().expect("vector mode draws vectors");
    assert!(!scene.view_box.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_full_turn() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: CHAT_API_KEY not set");
        return;
    }

    let dir = TempDir::new().unwrap();
    let game = Game::new(StoryConfig::from_env().with_cache_dir(dir.path())).await;
    assert!(matches!(game.start().await, TurnOutcome::Advanced(_)));

    let state = game.state();
    assert_eq!(state.status, GameStatus::Playing);
    let choice = state.choices.first().cloned().expect("opening offers choices");
    let outcome = game.choose(&choice).await;
    println!("{outcome:?}");

    let mut rx = game.subscribe();
    let _ = tokio::time::timeout(
        Duration::from_secs(120),
        rx.wait_for(|s| !s.illustration_loading),
    )
    .await;
    println!("{:#?}", game.state().illustration);
}
