//! Error types surfaced to the game state.

use thiserror::Error;

/// Errors from the narrative and illustration generators.
///
/// Backend detail never appears here: the generators log the underlying
/// cause and report one of these uniform variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// A backend call could not produce a usable structured result.
    #[error("{0}")]
    Failure(String),

    /// A vector scene was parsed but failed structural validation.
    #[error("The illustration data was malformed: {0}")]
    InvalidSceneData(String),
}

impl GenerationError {
    pub(crate) fn next_step() -> Self {
        Self::Failure(
            "Failed to generate the next step of the story. The storyteller may be experiencing issues."
                .to_string(),
        )
    }

    pub(crate) fn scene_image() -> Self {
        Self::Failure("Failed to generate the scene's image.".to_string())
    }

    /// Whether this is the distinct malformed-scene case.
    pub fn is_invalid_scene(&self) -> bool {
        matches!(self, Self::InvalidSceneData(_))
    }
}
