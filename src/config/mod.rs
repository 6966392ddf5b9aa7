//! Configuration module for the styling service

use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};
use std::path::PathBuf;

/// Main application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub gemini: GeminiSettings,
    pub history: HistorySettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Upper bound for JSON bodies carrying base64 images
    pub max_payload_mb: usize,
}

/// Hosted model configuration
///
/// The API key is not part of the settings file; it is read from
/// `GEMINI_API_KEY` (or `API_KEY`) by `ProviderCredentials::from_env`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    pub base_url: String,
    /// Multimodal model used for the stylized variants
    pub image_model: String,
    /// Text model used for idea generation and style analysis
    pub text_model: String,
    /// Imagen model used for template thumbnails
    pub thumbnail_model: String,
    pub rate_limit_per_minute: u32,
    pub timeout_secs: u64,
}

/// Generation history persistence
#[derive(Debug, Clone, Deserialize)]
pub struct HistorySettings {
    /// Key prefix, keys look like `<namespace>_<name>_<size>`
    pub namespace: String,
    pub capacity: usize,
    /// JSON file backing the key-value store; in-memory when unset
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with STYLER__)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let defaults = Settings::default();

        let builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("server.max_payload_mb", defaults.server.max_payload_mb as i64)?
            .set_default("gemini.base_url", defaults.gemini.base_url)?
            .set_default("gemini.image_model", defaults.gemini.image_model)?
            .set_default("gemini.text_model", defaults.gemini.text_model)?
            .set_default("gemini.thumbnail_model", defaults.gemini.thumbnail_model)?
            .set_default("gemini.rate_limit_per_minute", defaults.gemini.rate_limit_per_minute as i64)?
            .set_default("gemini.timeout_secs", defaults.gemini.timeout_secs as i64)?
            .set_default("history.namespace", defaults.history.namespace)?
            .set_default("history.capacity", defaults.history.capacity as i64)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // STYLER__SERVER__PORT, STYLER__GEMINI__IMAGE_MODEL, ...
            .add_source(
                Environment::with_prefix("STYLER")
                    .separator("__")
                    .try_parsing(true)
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                workers: None,
                max_payload_mb: 25,
            },
            gemini: GeminiSettings {
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                image_model: "gemini-2.5-flash-image-preview".to_string(),
                text_model: "gemini-2.5-flash".to_string(),
                thumbnail_model: "imagen-4.0-generate-001".to_string(),
                rate_limit_per_minute: 60,
                timeout_secs: 120,
            },
            history: HistorySettings {
                namespace: "gen_history".to_string(),
                capacity: crate::engine::DEFAULT_HISTORY_CAPACITY,
                path: None,
            },
        }
    }
}
