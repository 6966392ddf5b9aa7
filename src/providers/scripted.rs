//! Scripted in-process model for tests

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{
    ContentRequest, GenerativeModel, ImagePrompt, InlineImage, ModelReply, Part, ProviderError, ProviderResult,
};

/// Scripted result of one call
pub enum Outcome {
    Reply(ModelReply),
    Fail(String),
}

impl Outcome {
    pub fn image(data: &str) -> Self {
        Outcome::Reply(ModelReply::with_parts(vec![Part::Image(InlineImage {
            mime_type: "image/png".to_string(),
            data: data.to_string(),
        })]))
    }

    pub fn text(text: &str) -> Self {
        Outcome::Reply(ModelReply::with_parts(vec![Part::Text(text.to_string())]))
    }
}

/// Pops one scripted outcome per call, optionally after a delay
pub struct ScriptedModel {
    configured: bool,
    script: Mutex<VecDeque<(Outcome, Duration)>>,
    images: Mutex<VecDeque<Vec<InlineImage>>>,
    requests: Mutex<Vec<ContentRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        ScriptedModel {
            configured: true,
            script: Mutex::new(VecDeque::new()),
            images: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        ScriptedModel {
            configured: false,
            ..Self::new()
        }
    }

    pub fn then(self, outcome: Outcome) -> Self {
        self.then_after(outcome, Duration::ZERO)
    }

    pub fn then_after(self, outcome: Outcome, delay: Duration) -> Self {
        self.script.lock().push_back((outcome, delay));
        self
    }

    pub fn then_images(self, images: Vec<InlineImage>) -> Self {
        self.images.lock().push_back(images);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn code(&self) -> &'static str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate_content(&self, request: ContentRequest) -> ProviderResult<ModelReply> {
        self.requests.lock().push(request);
        let next = self.script.lock().pop_front();
        let (outcome, delay) = next.ok_or_else(|| ProviderError::ApiError {
            status: 500,
            message: "script exhausted".to_string(),
        })?;

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match outcome {
            Outcome::Reply(reply) => Ok(reply),
            Outcome::Fail(message) => Err(ProviderError::ApiError { status: 500, message }),
        }
    }

    async fn generate_images(&self, _request: ImagePrompt) -> ProviderResult<Vec<InlineImage>> {
        Ok(self.images.lock().pop_front().unwrap_or_default())
    }
}
