//! Runtime configuration for a story session.

use crate::store::CacheStore;
use std::path::PathBuf;

/// Default model for narrative and vector-scene generation.
pub const DEFAULT_TEXT_MODEL: &str = "deepseek/deepseek-chat-v3.1:free";

/// Default model for bitmap illustration.
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image-preview";

/// Default directory for the persisted illustration cache, relative to the
/// working directory.
pub const DEFAULT_CACHE_DIR: &str = ".echoes";

/// How scene illustrations are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IllustrationMode {
    /// Declarative vector scenes only.
    #[default]
    Vector,
    /// Bitmap images, falling back to a vector scene on any failure.
    Bitmap,
}

impl IllustrationMode {
    /// Parse the `GEN_SVG_IMAGE` flag: only the literal `false` selects bitmaps.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some("false") => Self::Bitmap,
            _ => Self::Vector,
        }
    }
}

/// Configuration for creating a story session.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// API key for narrative and vector-scene generation.
    pub chat_api_key: Option<String>,

    /// API key for bitmap generation.
    pub image_api_key: Option<String>,

    /// Model for narrative and vector-scene generation.
    pub text_model: String,

    /// Model for bitmap generation.
    pub image_model: String,

    pub illustration_mode: IllustrationMode,

    /// Directory holding the persisted illustration cache.
    pub cache_dir: PathBuf,

    /// Attribution sent with every request.
    pub app_referer: String,
    pub app_title: String,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            chat_api_key: None,
            image_api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            illustration_mode: IllustrationMode::default(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            app_referer: "http://localhost:3000".to_string(),
            app_title: "Echoes of the Bell: A School Rescue".to_string(),
        }
    }
}

impl StoryConfig {
    /// Create a config with defaults and no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the environment.
    ///
    /// Missing keys are left unset; generation then fails through the
    /// normal error channels instead of at startup.
    pub fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        config.chat_api_key = var("CHAT_API_KEY");
        config.image_api_key = var("IMAGE_API_KEY");
        if let Some(model) = var("TEXT_MODEL") {
            config.text_model = model;
        }
        if let Some(model) = var("IMAGE_MODEL") {
            config.image_model = model;
        }
        config.illustration_mode = IllustrationMode::from_flag(var("GEN_SVG_IMAGE").as_deref());
        if let Some(dir) = var("ILLUSTRATION_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        config
    }

    pub fn with_chat_api_key(mut self, key: impl Into<String>) -> Self {
        self.chat_api_key = Some(key.into());
        self
    }

    pub fn with_image_api_key(mut self, key: impl Into<String>) -> Self {
        self.image_api_key = Some(key.into());
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn with_illustration_mode(mut self, mode: IllustrationMode) -> Self {
        self.illustration_mode = mode;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// The file-backed illustration cache store under `cache_dir`.
    pub fn cache_store(&self) -> CacheStore {
        CacheStore::in_dir(self.cache_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Illustration;
    use crate::store::IllustrationCache;
    use tempfile::TempDir;

    #[test]
    fn test_mode_flag() {
        assert_eq!(IllustrationMode::from_flag(None), IllustrationMode::Vector);
        assert_eq!(IllustrationMode::from_flag(Some("true")), IllustrationMode::Vector);
        assert_eq!(IllustrationMode::from_flag(Some("0")), IllustrationMode::Vector);
        assert_eq!(IllustrationMode::from_flag(Some("false")), IllustrationMode::Bitmap);
    }

    #[test]
    fn test_config_builder() {
        let config = StoryConfig::new()
            .with_chat_api_key("chat")
            .with_text_model("local/model")
            .with_illustration_mode(IllustrationMode::Bitmap)
            .with_cache_dir("/tmp/echoes");

        assert_eq!(config.chat_api_key.as_deref(), Some("chat"));
        assert!(config.image_api_key.is_none());
        assert_eq!(config.text_model, "local/model");
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.illustration_mode, IllustrationMode::Bitmap);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/echoes"));
    }

    #[test]
    fn test_default_cache_dir_is_on_disk() {
        let config = StoryConfig::default();
        assert_eq!(config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(
            config.cache_store().record_path(),
            Some(PathBuf::from(".echoes/illustration-cache.json"))
        );
    }

    #[tokio::test]
    async fn test_cache_store_outlives_its_instance() {
        let dir = TempDir::new().unwrap();
        let config = StoryConfig::new().with_cache_dir(dir.path());

        let mut cache = IllustrationCache::new();
        cache.insert("gates".to_string(), Illustration::Bitmap("ref".to_string()));
        config.cache_store().save(&cache).await;

        assert_eq!(config.cache_store().load().await, cache);
        assert!(dir.path().join("illustration-cache.json").exists());
    }
}
