//! Illustration cache persistence across games.

use echoes_core::store::CACHE_RECORD;
use echoes_core::testing::{turn, FailingRecords, MockIllustrator, MockStoryTeller};
use echoes_core::{
    CacheStore, FileRecords, Game, GameState, Illustration, IllustrationStatus, TurnOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn settled(game: &Game) -> GameState {
    let mut rx = game.subscribe();
    let state = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| !s.illustration_loading),
    )
    .await
        .expect("timed out waiting for the illustration")
        .expect("state channel closed")
        .clone();
    state
}

fn opening(scene: &str) -> Arc<MockStoryTeller> {
    Arc::new(MockStoryTeller::new(vec![turn("Dusk.", &["Enter"], scene)]))
}

#[tokio::test]
async fn test_cache_survives_restart_of_process() {
    let dir = TempDir::new().unwrap();

    let first_illustrator = Arc::new(MockIllustrator::new());
    let first = Game::with_parts(
        opening("gates at dusk"),
        first_illustrator.clone(),
        CacheStore::in_dir(dir.path()),
    )
    .await;
    first.start().await;
    settled(&first).await;
    assert!(FileRecords::new(dir.path()).path_for(CACHE_RECORD).exists());

    let second_illustrator = Arc::new(MockIllustrator::new());
    let second = Game::with_parts(
        opening("gates at dusk"),
        second_illustrator.clone(),
        CacheStore::in_dir(dir.path()),
    )
    .await;
    assert_eq!(
        second.cached_illustration("gates at dusk").await,
        Some(Illustration::Bitmap("bitmap:gates at dusk".to_string()))
    );
    assert_eq!(
        second.start().await,
        TurnOutcome::Advanced(IllustrationStatus::Cached)
    );
    assert_eq!(second_illustrator.calls(), 0);
}

#[tokio::test]
async fn test_new_entries_extend_the_loaded_cache() {
    let dir = TempDir::new().unwrap();

    let first = Game::with_parts(
        opening("gates at dusk"),
        Arc::new(MockIllustrator::new()),
        CacheStore::in_dir(dir.path()),
    )
    .await;
    first.start().await;
    settled(&first).await;

    let second = Game::with_parts(
        opening("a dark hallway"),
        Arc::new(MockIllustrator::new()),
        CacheStore::in_dir(dir.path()),
    )
    .await;
    second.start().await;
    settled(&second).await;

    let reloaded = CacheStore::in_dir(dir.path()).load().await;
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.contains_key("gates at dusk"));
    assert!(reloaded.contains_key("a dark hallway"));
}

#[tokio::test]
async fn test_clearing_removes_the_record() {
    let dir = TempDir::new().unwrap();
    let game = Game::with_parts(
        opening("gates at dusk"),
        Arc::new(MockIllustrator::new()),
        CacheStore::in_dir(dir.path()),
    )
    .await;
    game.start().await;
    settled(&game).await;

    game.clear_illustration_cache().await;
    assert!(!FileRecords::new(dir.path()).path_for(CACHE_RECORD).exists());
    assert!(CacheStore::in_dir(dir.path()).load().await.is_empty());
}

#[tokio::test]
async fn test_corrupt_record_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = FileRecords::new(dir.path()).path_for(CACHE_RECORD);
    std::fs::write(&path, "{ definitely not a cache").unwrap();

    let illustrator = Arc::new(MockIllustrator::new());
    let game = Game::with_parts(
        opening("gates at dusk"),
        illustrator.clone(),
        CacheStore::in_dir(dir.path()),
    )
    .await;
    assert_eq!(game.cached_illustrations().await, 0);

    game.start().await;
    settled(&game).await;
    assert_eq!(illustrator.calls(), 1);
    assert_eq!(CacheStore::in_dir(dir.path()).load().await.len(), 1);
}

#[tokio::test]
async fn test_storage_failures_do_not_break_play() {
    let game = Game::with_parts(
        opening("gates at dusk"),
        Arc::new(MockIllustrator::new()),
        CacheStore::new(Arc::new(FailingRecords)),
    )
    .await;

    game.start().await;
    let state = settled(&game).await;
    assert_eq!(
        state.illustration,
        Some(Illustration::Bitmap("bitmap:gates at dusk".to_string()))
    );
    assert!(state.illustration_error.is_none());
    assert_eq!(game.cached_illustrations().await, 1);
}
