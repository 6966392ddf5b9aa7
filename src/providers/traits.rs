//! Provider trait definitions for hosted generative models
//!
//! This module defines the contract the generation client depends on. A
//! provider turns a list of text and inline-image parts into a normalized
//! `ModelReply`, leaving interpretation (safety blocks, missing images) to
//! the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GeminiSettings;

// ============================================================================
// Error Types
// ============================================================================

/// Provider error types
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

// ============================================================================
// Request / Reply Types
// ============================================================================

/// Base64 payload with its MIME type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64, no data URI prefix
    pub data: String,
}

impl InlineImage {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// One element of a multimodal request or reply
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image(InlineImage),
}

/// What kind of output a request expects
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTask {
    /// Image-capable model, image and text modalities
    Image,
    /// Plain text answer
    Text,
    /// JSON answer constrained by a response schema
    Json { schema: serde_json::Value },
}

/// A single generate-content call
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub task: ModelTask,
    pub parts: Vec<Part>,
}

/// Text-to-image request for the dedicated image model
#[derive(Debug, Clone)]
pub struct ImagePrompt {
    pub prompt: String,
    pub aspect_ratio: String,
    pub mime_type: String,
    pub count: u32,
}

/// Normalized view of the first candidate of a model reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub finish_reason: Option<String>,
    /// Prompt-level block reason, when the provider reports one
    pub block_reason: Option<String>,
    /// `None` when the first candidate is missing or carries no content
    pub parts: Option<Vec<Part>>,
}

impl ModelReply {
    /// Reply with content parts and a normal finish
    #[cfg(test)]
    pub fn with_parts(parts: Vec<Part>) -> Self {
        ModelReply {
            finish_reason: Some("STOP".to_string()),
            block_reason: None,
            parts: Some(parts),
        }
    }

    /// Reply withheld for policy reasons
    pub fn blocked(block_reason: Option<&str>) -> Self {
        ModelReply {
            finish_reason: Some("SAFETY".to_string()),
            block_reason: block_reason.map(str::to_string),
            parts: None,
        }
    }

    /// Withheld for safety, or no content at all
    pub fn is_withheld(&self) -> bool {
        self.finish_reason.as_deref() == Some("SAFETY") || self.parts.is_none()
    }

    pub fn first_image(&self) -> Option<&InlineImage> {
        self.parts.as_ref()?.iter().find_map(|part| match part {
            Part::Image(image) => Some(image),
            Part::Text(_) => None,
        })
    }

    /// All text parts joined, `None` if there are none
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .parts
            .as_ref()?
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                Part::Image(_) => None,
            })
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Provider credentials for authentication
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub api_key: Option<String>,
}

impl ProviderCredentials {
    /// Read `GEMINI_API_KEY`, falling back to `API_KEY`
    pub fn from_env() -> Self {
        let api_key = ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());

        ProviderCredentials { api_key }
    }

    #[cfg(test)]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        ProviderCredentials {
            api_key: Some(api_key.into()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Hosted multimodal model
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Provider code (e.g., "gemini")
    fn code(&self) -> &'static str;

    /// Whether credentials are present; checked before any network call
    fn is_configured(&self) -> bool;

    /// Single generate-content call, no retries
    async fn generate_content(&self, request: ContentRequest) -> ProviderResult<ModelReply>;

    /// Text-to-image generation
    async fn generate_images(&self, request: ImagePrompt) -> ProviderResult<Vec<InlineImage>>;
}

// ============================================================================
// Provider Factory
// ============================================================================

/// Provider factory for creating provider instances
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider instance by code, or None if the code is unknown
    pub fn create(
        code: &str,
        settings: &GeminiSettings,
        credentials: ProviderCredentials,
    ) -> ProviderResult<Option<Arc<dyn GenerativeModel>>> {
        match code {
            "gemini" => Ok(Some(Arc::new(crate::providers::gemini::GeminiProvider::new(settings, credentials)?))),
            _ => Ok(None),
        }
    }
}
