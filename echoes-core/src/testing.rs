//! Testing utilities for the story engine.
//!
//! This module provides deterministic stand-ins for every external seam:
//! - `ScriptedBackend` replays canned chat completions
//! - `MockStoryTeller` and `MockIllustrator` replace the generators
//! - `Gate` holds a mock call open until the test releases it
//! - `FailingRecords` is a record store whose every operation fails

use crate::backend::ChatBackend;
use crate::error::GenerationError;
use crate::illustration::Illustrator;
use crate::narrative::{StoryTeller, TurnResult};
use crate::scene::Illustration;
use crate::store::{RecordStore, StorageError};
use async_trait::async_trait;
use openrouter::{ContentBlock, FinishReason, Request, Response, Usage};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A chat backend that replays queued responses in order.
///
/// Every request is recorded. Once the queue is exhausted each call fails
/// with [`openrouter::Error::EmptyResponse`].
#[derive(Default)]
pub struct ScriptedBackend {
    queue: Mutex<VecDeque<Result<Response, openrouter::Error>>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text completion.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Ok(response(vec![ContentBlock::Text { text: text.into() }])));
    }

    /// Queue a completion carrying one image.
    pub fn push_image(&self, url: &str) {
        self.push(Ok(response(vec![ContentBlock::Image {
            url: url.to_string(),
        }])));
    }

    /// Queue a failed call.
    pub fn push_error(&self, error: openrouter::Error) {
        self.push(Err(error));
    }

    fn push(&self, result: Result<Response, openrouter::Error>) {
        lock(&self.queue).push_back(result);
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.requests).clone()
    }
}

fn response(content: Vec<ContentBlock>) -> Response {
    Response {
        id: "scripted".to_string(),
        model: "scripted".to_string(),
        content,
        finish_reason: FinishReason::Stop,
        usage: Usage::default(),
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, request: Request) -> Result<Response, openrouter::Error> {
        lock(&self.requests).push(request);
        lock(&self.queue)
            .pop_front()
            .unwrap_or(Err(openrouter::Error::EmptyResponse))
    }
}

/// Holds calls open until released.
#[derive(Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let one waiting (or future) call through.
    pub fn release(&self) {
        self.permits.add_permits(1);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a continuing turn.
pub fn turn(story: &str, choices: &[&str], scene: &str) -> TurnResult {
    TurnResult {
        story: story.to_string(),
        choices: choices.iter().map(|c| c.to_string()).collect(),
        game_over: false,
        game_over_message: String::new(),
        scene_description: scene.to_string(),
    }
}

/// Build a final turn.
pub fn ending(message: &str) -> TurnResult {
    TurnResult {
        story: String::new(),
        choices: Vec::new(),
        game_over: true,
        game_over_message: message.to_string(),
        scene_description: String::new(),
    }
}

/// A storyteller that returns scripted steps in order.
///
/// Contexts are recorded. Once the script runs out each call fails.
#[derive(Default)]
pub struct MockStoryTeller {
    script: Mutex<VecDeque<Result<TurnResult, GenerationError>>>,
    contexts: Mutex<Vec<String>>,
    gate: Option<Gate>,
}

impl MockStoryTeller {
    pub fn new(steps: Vec<TurnResult>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// Hold every call until the gate is released.
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn push(&self, step: TurnResult) {
        lock(&self.script).push_back(Ok(step));
    }

    pub fn push_failure(&self, message: &str) {
        lock(&self.script).push_back(Err(GenerationError::Failure(message.to_string())));
    }

    /// Every context received so far, oldest first.
    pub fn contexts(&self) -> Vec<String> {
        lock(&self.contexts).clone()
    }
}

#[async_trait]
impl StoryTeller for MockStoryTeller {
    async fn next_step(&self, context: &str) -> Result<TurnResult, GenerationError> {
        lock(&self.contexts).push(context.to_string());
        if let Some(ref gate) = self.gate {
            gate.pass().await;
        }
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Failure("script exhausted".to_string())))
    }
}

/// An illustrator that draws `bitmap:<scene>` for every scene.
///
/// Specific scenes can be given their own illustration or made to fail.
#[derive(Default)]
pub struct MockIllustrator {
    scenes: Mutex<HashMap<String, Illustration>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
    gate: Option<Gate>,
}

impl MockIllustrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every call until the gate is released.
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set(&self, scene: &str, illustration: Illustration) {
        lock(&self.scenes).insert(scene.to_string(), illustration);
    }

    pub fn fail_on(&self, scene: &str) {
        lock(&self.failing).insert(scene.to_string());
    }

    /// The illustration this mock produces for a scene.
    pub fn drawing_for(&self, scene: &str) -> Illustration {
        lock(&self.scenes)
            .get(scene)
            .cloned()
            .unwrap_or_else(|| Illustration::Bitmap(format!("bitmap:{scene}")))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Scenes requested so far, oldest first.
    pub fn requested(&self) -> Vec<String> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl Illustrator for MockIllustrator {
    async fn scene_image(&self, scene: &str) -> Result<Illustration, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requested).push(scene.to_string());
        if let Some(ref gate) = self.gate {
            gate.pass().await;
        }
        if lock(&self.failing).contains(scene) {
            return Err(GenerationError::Failure(
                "Failed to generate the scene's image.".to_string(),
            ));
        }
        Ok(self.drawing_for(scene))
    }
}

/// A record store that fails every operation.
#[derive(Debug, Default)]
pub struct FailingRecords;

fn unavailable() -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "storage unavailable",
    ))
}

#[async_trait]
impl RecordStore for FailingRecords {
    async fn read(&self, _name: &str) -> Result<Option<String>, StorageError> {
        Err(unavailable())
    }

    async fn write(&self, _name: &str, _contents: &str) -> Result<(), StorageError> {
        Err(unavailable())
    }

    async fn remove(&self, _name: &str) -> Result<(), StorageError> {
        Err(unavailable())
    }
}
