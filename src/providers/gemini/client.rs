//! Gemini API Client Implementation
//!
//! API Docs: https://ai.google.dev/api/generate-content

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::GeminiSettings;
use crate::providers::http_client::RateLimitedClient;
use crate::providers::traits::{
    ContentRequest, GenerativeModel, ImagePrompt, InlineImage, ModelReply, ModelTask, ProviderCredentials,
    ProviderError, ProviderResult,
};

use super::mapper::GeminiMapper;
use super::models::{ErrorEnvelope, GenerateContentResponse, PredictResponse};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API client
pub struct GeminiProvider {
    /// Rate-limited HTTP client
    client: RateLimitedClient,

    api_key: Option<String>,

    /// API base URL, e.g. https://generativelanguage.googleapis.com/v1beta
    base_url: String,

    image_model: String,
    text_model: String,
    thumbnail_model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider instance
    pub fn new(settings: &GeminiSettings, credentials: ProviderCredentials) -> ProviderResult<Self> {
        Ok(GeminiProvider {
            client: RateLimitedClient::new(
                settings.rate_limit_per_minute,
                Duration::from_secs(settings.timeout_secs.max(1)),
            )?,
            api_key: credentials.api_key.filter(|key| !key.is_empty()),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            image_model: settings.image_model.clone(),
            text_model: settings.text_model.clone(),
            thumbnail_model: settings.thumbnail_model.clone(),
        })
    }

    fn model_for(&self, task: &ModelTask) -> &str {
        match task {
            ModelTask::Image => &self.image_model,
            ModelTask::Text | ModelTask::Json { .. } => &self.text_model,
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    /// POST a JSON body and decode the JSON reply
    async fn post<B: Serialize, R: DeserializeOwned>(&self, url: &str, body: &B) -> ProviderResult<R> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        debug!(url = %url, "Gemini API request");

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| match envelope.error.status {
                    Some(code) => format!("{}: {}", code, envelope.error.message),
                    None => envelope.error.message,
                })
                .unwrap_or_else(|_| text.chars().take(500).collect());
            warn!(status = status.as_u16(), message = %message, "Gemini API error");
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            ProviderError::ParseError(format!(
                "JSON parse error: {} - Body: {}",
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiProvider {
    fn code(&self) -> &'static str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_content(&self, request: ContentRequest) -> ProviderResult<ModelReply> {
        let url = self.endpoint(self.model_for(&request.task), "generateContent");
        let body = GeminiMapper::to_request(&request);
        let response: GenerateContentResponse = self.post(&url, &body).await?;
        Ok(GeminiMapper::to_reply(response))
    }

    async fn generate_images(&self, request: ImagePrompt) -> ProviderResult<Vec<InlineImage>> {
        let url = self.endpoint(&self.thumbnail_model, "predict");
        let body = GeminiMapper::to_predict_request(&request);
        let response: PredictResponse = self.post(&url, &body).await?;
        Ok(GeminiMapper::to_images(response, &request.mime_type))
    }
}
