//! Narrative generation: accumulated context in, next story step out.

use crate::backend::ChatBackend;
use crate::error::GenerationError;
use crate::json::extract_object;
use crate::prompts::STORYTELLER_DIRECTIVE;
use async_trait::async_trait;
use openrouter::{Message, Request, ResponseFormat};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Field names of a turn result, which must never appear as choices.
pub const TURN_FIELDS: [&str; 5] = [
    "story",
    "choices",
    "gameOver",
    "gameOverMessage",
    "sceneDescription",
];

const NARRATIVE_TEMPERATURE: f32 = 0.8;
const NARRATIVE_TOP_P: f32 = 0.95;

/// One step of the story as produced by the storyteller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnResult {
    pub story: String,
    pub choices: Vec<String>,
    pub game_over: bool,
    pub game_over_message: String,
    pub scene_description: String,
}

/// Something that can continue the story.
#[async_trait]
pub trait StoryTeller: Send + Sync {
    /// Produce the next step for the given context.
    async fn next_step(&self, context: &str) -> Result<TurnResult, GenerationError>;
}

/// Why a narrative call failed. Logged, never shown to the player.
#[derive(Debug, Error)]
enum NarrativeError {
    #[error("backend error: {0}")]
    Backend(#[from] openrouter::Error),

    #[error("no JSON object in response")]
    NoJson,

    #[error("malformed turn JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storyteller backed by a chat-completion model.
pub struct NarrativeGenerator {
    backend: Arc<dyn ChatBackend>,
    model: Option<String>,
}

impl NarrativeGenerator {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn build_request(&self, context: &str) -> Request {
        let mut request = Request::new(vec![Message::user(context)])
            .with_system(STORYTELLER_DIRECTIVE)
            .with_response_format(ResponseFormat::JsonSchema {
                name: "turn_result".to_string(),
                schema: turn_schema(),
            })
            .with_temperature(NARRATIVE_TEMPERATURE)
            .with_top_p(NARRATIVE_TOP_P);

        if let Some(ref model) = self.model {
            request = request.with_model(model);
        }
        request
    }

    async fn try_next_step(&self, context: &str) -> Result<TurnResult, NarrativeError> {
        let response = self.backend.complete(self.build_request(context)).await?;
        parse_turn(&response.text())
    }
}

#[async_trait]
impl StoryTeller for NarrativeGenerator {
    async fn next_step(&self, context: &str) -> Result<TurnResult, GenerationError> {
        match self.try_next_step(context).await {
            Ok(step) => {
                debug!(
                    choices = step.choices.len(),
                    game_over = step.game_over,
                    "Generated story step"
                );
                Ok(step)
            }
            Err(e) => {
                error!(error = %e, "Story generation failed");
                Err(GenerationError::next_step())
            }
        }
    }
}

/// JSON schema constraining the storyteller's output.
pub fn turn_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "story": {
                "type": "string",
                "description": "The next part of the story: the scene and the result of the player's action, one to three paragraphs."
            },
            "choices": {
                "type": "array",
                "description": "3-4 possible actions the player can take next.",
                "items": { "type": "string" }
            },
            "gameOver": {
                "type": "boolean",
                "description": "True if the player has won or lost the game."
            },
            "gameOverMessage": {
                "type": "string",
                "description": "When gameOver is true, a concluding message explaining the win or loss. Otherwise an empty string."
            },
            "sceneDescription": {
                "type": "string",
                "description": "A concise 5-15 word prompt for an image generator describing the current scene."
            }
        },
        "required": TURN_FIELDS,
        "additionalProperties": false
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTurn {
    story: String,
    #[serde(default)]
    choices: Value,
    #[serde(default)]
    game_over: bool,
    #[serde(default)]
    game_over_message: String,
    #[serde(default)]
    scene_description: String,
}

fn parse_turn(text: &str) -> Result<TurnResult, NarrativeError> {
    let json = extract_object(text).ok_or(NarrativeError::NoJson)?;
    let raw: RawTurn = serde_json::from_str(json)?;

    Ok(TurnResult {
        story: raw.story,
        choices: sanitize_choices(&raw.choices),
        game_over: raw.game_over,
        game_over_message: raw.game_over_message,
        scene_description: raw.scene_description.trim().to_string(),
    })
}

/// Clean up a raw `choices` value.
///
/// Every entry is coerced to a string and trimmed; empty entries, repeats,
/// turn field names and boolean literals are dropped. Anything other than
/// an array yields no choices.
pub fn sanitize_choices(raw: &Value) -> Vec<String> {
    let Some(entries) = raw.as_array() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    entries
        .iter()
        .map(|entry| match entry {
            Value::String(text) => text.trim().to_string(),
            other => other.to_string().trim().to_string(),
        })
        .filter(|choice| !choice.is_empty())
        .filter(|choice| !TURN_FIELDS.contains(&choice.as_str()))
        .filter(|choice| choice != "true" && choice != "false")
        .filter(|choice| seen.insert(choice.clone()))
        .collect()
}
