//! Scene illustration: vector scenes, with bitmaps as an opt-in primary.

use crate::backend::ChatBackend;
use crate::config::IllustrationMode;
use crate::error::GenerationError;
use crate::json::extract_object;
use crate::prompts::{bitmap_prompt, vector_scene_prompt, VECTOR_DIRECTIVE};
use crate::scene::{Illustration, InvalidScene, VectorScene};
use async_trait::async_trait;
use openrouter::{Message, Modality, Request, ResponseFormat};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

const VECTOR_TEMPERATURE: f32 = 1.0;

/// Something that can illustrate a scene description.
#[async_trait]
pub trait Illustrator: Send + Sync {
    async fn scene_image(&self, scene: &str) -> Result<Illustration, GenerationError>;
}

#[derive(Debug, Error)]
enum IllustrationError {
    #[error("backend error: {0}")]
    Backend(#[from] openrouter::Error),

    #[error("no JSON object in response")]
    NoJson,

    #[error("malformed scene JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid scene data: {0}")]
    InvalidScene(#[from] InvalidScene),

    #[error("no image data in response")]
    NoImage,
}

/// Illustrator backed by chat-completion models.
///
/// Vector scenes come from the text backend. Bitmaps come from the image
/// backend and fall back to a vector scene on any failure.
pub struct IllustrationGenerator {
    text: Arc<dyn ChatBackend>,
    image: Arc<dyn ChatBackend>,
    mode: IllustrationMode,
    text_model: Option<String>,
    image_model: Option<String>,
}

impl IllustrationGenerator {
    pub fn new(text: Arc<dyn ChatBackend>, image: Arc<dyn ChatBackend>) -> Self {
        Self {
            text,
            image,
            mode: IllustrationMode::default(),
            text_model: None,
            image_model: None,
        }
    }

    pub fn with_mode(mut self, mode: IllustrationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    pub fn mode(&self) -> IllustrationMode {
        self.mode
    }

    async fn vector(&self, scene: &str) -> Result<VectorScene, IllustrationError> {
        let mut request = Request::new(vec![Message::user(vector_scene_prompt(scene))])
            .with_system(VECTOR_DIRECTIVE)
            .with_response_format(ResponseFormat::JsonObject)
            .with_temperature(VECTOR_TEMPERATURE);
        if let Some(ref model) = self.text_model {
            request = request.with_model(model);
        }

        let response = self.text.complete(request).await?;
        let text = response.text();
        let json = extract_object(&text).ok_or(IllustrationError::NoJson)?;
        let value: serde_json::Value = serde_json::from_str(json)?;
        Ok(VectorScene::from_json(&value)?)
    }

    async fn bitmap(&self, scene: &str) -> Result<String, IllustrationError> {
        let mut request = Request::new(vec![Message::user(bitmap_prompt(scene))])
            .with_modalities(vec![Modality::Image, Modality::Text]);
        if let Some(ref model) = self.image_model {
            request = request.with_model(model);
        }

        let response = self.image.complete(request).await?;
        response
            .first_image()
            .map(str::to_string)
            .ok_or(IllustrationError::NoImage)
    }

    async fn generate(&self, scene: &str) -> Result<Illustration, IllustrationError> {
        match self.mode {
            IllustrationMode::Vector => self.vector(scene).await.map(Illustration::Vector),
            IllustrationMode::Bitmap => match self.bitmap(scene).await {
                Ok(reference) => Ok(Illustration::Bitmap(reference)),
                Err(e) => {
                    warn!(error = %e, "Bitmap generation failed, falling back to a vector scene");
                    self.vector(scene).await.map(Illustration::Vector)
                }
            },
        }
    }
}

#[async_trait]
impl Illustrator for IllustrationGenerator {
    async fn scene_image(&self, scene: &str) -> Result<Illustration, GenerationError> {
        match self.generate(scene).await {
            Ok(illustration) => {
                info!(scene, "Generated scene illustration");
                Ok(illustration)
            }
            Err(IllustrationError::InvalidScene(reason)) => {
                error!(scene, error = %reason, "Scene data failed validation");
                Err(GenerationError::InvalidSceneData(reason.0))
            }
            Err(e) => {
                error!(scene, error = %e, "Scene illustration failed");
                Err(GenerationError::scene_image())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Unconfigured;
    use crate::scene::{ShapeKind, VectorElement};
    use crate::testing::ScriptedBackend;

    const GOOD_SCENE: &str = r##"{
        "viewBox": "0 0 100 100",
        "backgroundColor": "#111",
        "elements": [{"type": "circle", "cx": 50, "cy": 50, "r": 10}]
    }"##;

    fn expected_scene() -> Illustration {
        Illustration::Vector(
            VectorScene::new("0 0 100 100", "#111").with_element(
                VectorElement::new(ShapeKind::Circle)
                    .attr("cx", 50)
                    .attr("cy", 50)
                    .attr("r", 10),
            ),
        )
    }

    #[tokio::test]
    async fn test_vector_mode() {
        let text = Arc::new(ScriptedBackend::new());
        text.push_text(format!("```json\n{GOOD_SCENE}\n```"));
        let generator = IllustrationGenerator::new(text.clone(), Arc::new(Unconfigured));

        let illustration = generator.scene_image("a lantern in the dark").await.unwrap();
        assert_eq!(illustration, expected_scene());

        let request = &text.requests()[0];
        assert_eq!(request.system.as_deref(), Some(VECTOR_DIRECTIVE));
        assert_eq!(request.temperature, Some(1.0));
        assert_eq!(request.response_format, Some(ResponseFormat::JsonObject));
        assert!(request.messages[0].content.contains("a lantern in the dark"));
    }

    #[tokio::test]
    async fn test_missing_background_is_invalid_scene_data() {
        let text = Arc::new(ScriptedBackend::new());
        text.push_text(r#"{"viewBox": "0 0 100 100", "elements": []}"#);
        let generator = IllustrationGenerator::new(text, Arc::new(Unconfigured));

        let err = generator.scene_image("a hallway").await.unwrap_err();
        assert!(err.is_invalid_scene());
    }

    #[tokio::test]
    async fn test_vector_transport_failure_is_terminal() {
        let text = Arc::new(ScriptedBackend::new());
        text.push_error(openrouter::Error::Network("connection reset".to_string()));
        text.push_text("I would rather describe it in words.");
        let generator = IllustrationGenerator::new(text, Arc::new(Unconfigured));

        assert_eq!(
            generator.scene_image("a hallway").await.unwrap_err(),
            GenerationError::scene_image()
        );
        assert_eq!(
            generator.scene_image("a hallway").await.unwrap_err(),
            GenerationError::scene_image()
        );
    }

    #[tokio::test]
    async fn test_bitmap_mode() {
        let text = Arc::new(ScriptedBackend::new());
        let image = Arc::new(ScriptedBackend::new());
        image.push_image("data:image/png;base64,iVBORw0KGgo=");
        let generator = IllustrationGenerator::new(text.clone(), image.clone())
            .with_mode(IllustrationMode::Bitmap)
            .with_image_model("image/model");

        let illustration = generator.scene_image("a bell tower").await.unwrap();
        assert_eq!(
            illustration,
            Illustration::Bitmap("data:image/png;base64,iVBORw0KGgo=".to_string())
        );
        assert!(text.requests().is_empty());

        let request = &image.requests()[0];
        assert_eq!(request.model.as_deref(), Some("image/model"));
        assert_eq!(request.modalities, Some(vec![Modality::Image, Modality::Text]));
    }

    #[tokio::test]
    async fn test_bitmap_without_image_falls_back_to_vector() {
        let text = Arc::new(ScriptedBackend::new());
        text.push_text(GOOD_SCENE);
        let image = Arc::new(ScriptedBackend::new());
        image.push_text("Sorry, I can only reply with text.");
        let generator =
            IllustrationGenerator::new(text, image).with_mode(IllustrationMode::Bitmap);

        assert_eq!(
            generator.scene_image("a bell tower").await.unwrap(),
            expected_scene()
        );
    }

    #[tokio::test]
    async fn test_missing_image_key_falls_back_to_vector() {
        let text = Arc::new(ScriptedBackend::new());
        text.push_text(GOOD_SCENE);
        let generator = IllustrationGenerator::new(text, Arc::new(Unconfigured))
            .with_mode(IllustrationMode::Bitmap);

        assert_eq!(
            generator.scene_image("a bell tower").await.unwrap(),
            expected_scene()
        );
    }

    #[tokio::test]
    async fn test_fallback_failure_surfaces_vector_error() {
        let text = Arc::new(ScriptedBackend::new());
        text.push_text(r##"{"backgroundColor": "#000", "elements": []}"##);
        let image = Arc::new(ScriptedBackend::new());
        image.push_error(openrouter::Error::Api {
            status: 500,
            message: "upstream".to_string(),
        });
        let generator =
            IllustrationGenerator::new(text, image).with_mode(IllustrationMode::Bitmap);

        let err = generator.scene_image("a bell tower").await.unwrap_err();
        assert!(err.is_invalid_scene());
    }
}
