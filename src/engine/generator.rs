//! Remote generation client
//!
//! Encodes images as inline parts and calls the hosted model. Variant
//! generation fans out `VARIANT_COUNT` independent calls and keeps whatever
//! succeeds; the other operations are single-shot.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{GenerationOptions, Template};
use crate::providers::{ContentRequest, GenerativeModel, ImagePrompt, InlineImage, ModelTask, Part, ProviderError};

/// Concurrent calls issued per variant request
pub const VARIANT_COUNT: usize = 3;

/// Fixed instruction used whenever a style reference image is supplied
pub const STYLE_TRANSFER_PROMPT: &str = "Take the person from the second image and place them into the first image. The person should replace any main subject in the first image, seamlessly matching the overall style, lighting, and composition of the first image.";

const IDEA_PROMPT: &str = r#"
    You are an expert in creative photo editing styles. Generate a single, novel photo editing template idea for a user's selfie. The idea should be unique and visually interesting. Your response must be a JSON object that conforms to the specified schema.
    - "id": A unique, lowercase, snake_case identifier for the template (e.g., "cosmic_dust").
    - "name": A short, catchy name for the template (e.g., "Cosmic Dust").
    - "prompt": A detailed, descriptive prompt for an AI image model to transform a selfie into this style. The prompt should be written in the second person, addressing the model (e.g., "Transform the person in the photo...").
    - "thumbnail": A placeholder image URL from picsum.photos, using the generated ID as the seed. The format must be exactly: "https://picsum.photos/seed/{id}/200".
"#;

const STYLE_ANALYSIS_PROMPT: &str = "You are an expert art director and a master prompt engineer for generative AI. Your task is to analyze the provided image and generate a highly detailed, descriptive text prompt that an AI image model can use to replicate its unique visual style.

Your analysis must be comprehensive. Deconstruct the image and describe the following elements with precision:
- **Art Medium & Style:** Is it a photograph, oil painting, 3D render, watercolor, etc.? Describe the overall style (e.g., hyper-realistic, impressionistic, surreal, anime, steampunk).
- **Subject & Composition:** What is the subject? How is it framed? Mention compositional rules like the rule of thirds, leading lines, or symmetry if applicable.
- **Camera & Lens:** Describe the photographic properties as if it were a real photo. What is the camera angle (e.g., eye-level, low-angle shot, high-angle shot, bird's-eye view)? What is the depth of field (e.g., shallow depth of field with a blurry bokeh background, deep focus where everything is sharp)?
- **Lighting:** Characterize the lighting. Is it soft and diffused, harsh and dramatic, cinematic, natural light, golden hour, neon glow? Mention the direction and color of the light.
- **Color Palette:** Describe the dominant colors, the overall color scheme (e.g., monochromatic, analogous, complementary), and the mood they create (e.g., muted and desaturated, vibrant and saturated, warm, cool).
- **Artistic Techniques:** Identify any specific techniques used, such as long exposure, lens flare, film grain, double exposure, visible brushstrokes, cross-hatching, or specific digital effects.
- **Mood & Atmosphere:** Summarize the overall feeling of the image (e.g., ethereal and dreamlike, gritty and dystopian, serene and peaceful, energetic and chaotic).

Combine these observations into a single, coherent paragraph. The prompt should be a direct instruction to the image model, rich with evocative adjectives and technical details.";

/// Generation errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Model provider not configured: {0}")]
    NotConfigured(String),

    /// Every variant failed; carries the first-initiated call's reason
    #[error("{0}")]
    AllVariantsFailed(String),

    #[error("Image generation was blocked due to safety reasons: {0}")]
    Blocked(String),

    #[error("The model did not return an image. Please try a different prompt or image.")]
    NoImage,

    #[error("Thumbnail generation failed, no image was returned.")]
    NoThumbnail,

    #[error("The model returned no text")]
    EmptyText,

    #[error("Invalid template idea: {0}")]
    InvalidIdea(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Encode raw bytes as an inline part payload
pub fn inline_image(mime_type: &str, data: &[u8]) -> InlineImage {
    InlineImage {
        mime_type: if mime_type.is_empty() { "application/octet-stream".to_string() } else { mime_type.to_string() },
        data: STANDARD.encode(data),
    }
}

/// Inputs of one variant request, derived fresh per call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub base_prompt: String,
    pub options: GenerationOptions,
    pub style_image: Option<InlineImage>,
}

impl GenerationRequest {
    /// Text sent with the images.
    ///
    /// With a style reference image the fixed style-transfer instruction is
    /// used and the base prompt, mode and resolution are ignored.
    pub fn prompt_text(&self) -> String {
        match self.style_image {
            Some(_) => STYLE_TRANSFER_PROMPT.to_string(),
            None => self.options.final_prompt(&self.base_prompt),
        }
    }

    /// Style image first, subject second, instruction last
    fn parts(&self, subject: &InlineImage) -> Vec<Part> {
        let mut parts = Vec::with_capacity(3);
        if let Some(style) = &self.style_image {
            parts.push(Part::Image(style.clone()));
        }
        parts.push(Part::Image(subject.clone()));
        parts.push(Part::Text(self.prompt_text()));
        parts
    }
}

/// Client for every remote model operation the editor needs
#[derive(Clone)]
pub struct GenerationClient {
    model: Arc<dyn GenerativeModel>,
}

impl GenerationClient {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        GenerationClient { model }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_configured()
    }

    fn ensure_configured(&self) -> Result<(), GenerationError> {
        if self.model.is_configured() {
            Ok(())
        } else {
            Err(GenerationError::NotConfigured(format!(
                "{} API key is not set",
                self.model.code()
            )))
        }
    }

    /// Generate up to `VARIANT_COUNT` stylized variants of `subject`.
    ///
    /// All calls settle independently. Successes are returned in initiation
    /// order; if none succeed the first call's failure reason is returned.
    pub async fn generate_variants(
        &self,
        subject: &InlineImage,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, GenerationError> {
        self.ensure_configured()?;

        let parts = request.parts(subject);
        info!(
            provider = self.model.code(),
            variants = VARIANT_COUNT,
            with_style_image = request.style_image.is_some(),
            "Requesting image variants"
        );

        let calls = (0..VARIANT_COUNT).map(|index| self.generate_single(index, parts.clone()));
        let settled = join_all(calls).await;

        let mut images = Vec::with_capacity(VARIANT_COUNT);
        let mut failures = Vec::new();
        for outcome in settled {
            match outcome {
                Ok(image) => images.push(image),
                Err(e) => failures.push(e.to_string()),
            }
        }

        if images.is_empty() {
            error!(reasons = ?failures, "All image generation attempts failed");
            let reason = failures
                .into_iter()
                .next()
                .unwrap_or_else(|| "The model failed to generate any images.".to_string());
            return Err(GenerationError::AllVariantsFailed(reason));
        }

        info!(succeeded = images.len(), failed = failures.len(), "Image variants generated");
        Ok(images)
    }

    async fn generate_single(&self, index: usize, parts: Vec<Part>) -> Result<String, GenerationError> {
        let reply = self
            .model
            .generate_content(ContentRequest {
                task: ModelTask::Image,
                parts,
            })
            .await
            .map_err(|e| {
                warn!(variant = index, error = %e, "Variant request failed");
                GenerationError::from(e)
            })?;

        if reply.is_withheld() {
            let reason = reply.block_reason.clone().unwrap_or_else(|| "Unknown".to_string());
            warn!(variant = index, block_reason = %reason, "Image generation blocked");
            return Err(GenerationError::Blocked(reason));
        }

        match reply.first_image() {
            Some(image) => Ok(image.to_data_uri()),
            None => {
                warn!(variant = index, "Model response did not contain an image part");
                Err(GenerationError::NoImage)
            }
        }
    }

    /// Ask the text model for a new template idea
    pub async fn generate_template_idea(&self) -> Result<Template, GenerationError> {
        self.ensure_configured()?;

        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING", "description": "A unique, lowercase, snake_case identifier." },
                "name": { "type": "STRING", "description": "A short, catchy name for the template." },
                "prompt": { "type": "STRING", "description": "A detailed prompt for the image model." },
                "thumbnail": { "type": "STRING", "description": "A placeholder image URL from picsum.photos." }
            },
            "required": ["id", "name", "prompt", "thumbnail"]
        });

        let reply = self
            .model
            .generate_content(ContentRequest {
                task: ModelTask::Json { schema },
                parts: vec![Part::Text(IDEA_PROMPT.to_string())],
            })
            .await?;

        let text = reply.text().ok_or(GenerationError::EmptyText)?;
        let template: Template =
            serde_json::from_str(text.trim()).map_err(|e| GenerationError::InvalidIdea(e.to_string()))?;

        if template.id.trim().is_empty() || template.name.trim().is_empty() || template.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidIdea("id, name and prompt are required".to_string()));
        }

        info!(template_id = %template.id, "Generated template idea");
        Ok(template)
    }

    /// Describe a style image as a reusable text prompt
    pub async fn prompt_from_style_image(&self, style_image: &InlineImage) -> Result<String, GenerationError> {
        self.ensure_configured()?;

        let reply = self
            .model
            .generate_content(ContentRequest {
                task: ModelTask::Text,
                parts: vec![Part::Text(STYLE_ANALYSIS_PROMPT.to_string()), Part::Image(style_image.clone())],
            })
            .await?;

        if reply.is_withheld() {
            return Err(GenerationError::Blocked(
                reply.block_reason.unwrap_or_else(|| "Unknown".to_string()),
            ));
        }

        let text = reply.text().map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        text.ok_or(GenerationError::EmptyText)
    }

    /// Square JPEG thumbnail illustrating a prompt, as a data URI
    pub async fn thumbnail_for_prompt(&self, prompt: &str) -> Result<String, GenerationError> {
        self.ensure_configured()?;

        let images = self
            .model
            .generate_images(ImagePrompt {
                prompt: format!(
                    "A visually striking, simple, iconic, square thumbnail image representing the artistic style of: \"{}\"",
                    prompt
                ),
                aspect_ratio: "1:1".to_string(),
                mime_type: "image/jpeg".to_string(),
                count: 1,
            })
            .await?;

        images
            .into_iter()
            .next()
            .map(|image| image.to_data_uri())
            .ok_or(GenerationError::NoThumbnail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::{GenerationMode, Resolution};
    use crate::providers::scripted::{Outcome, ScriptedModel};
    use crate::providers::ModelReply;

    fn subject() -> InlineImage {
        inline_image("image/png", b"subject")
    }

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest {
            base_prompt: prompt.to_string(),
            options: GenerationOptions::default(),
            style_image: None,
        }
    }

    fn client(model: ScriptedModel) -> (Arc<ScriptedModel>, GenerationClient) {
        let model = Arc::new(model);
        (model.clone(), GenerationClient::new(model))
    }

    #[tokio::test]
    async fn test_partial_success_keeps_initiation_order() {
        let (model, client) = client(
            ScriptedModel::new()
                .then(Outcome::Fail("boom".into()))
                .then_after(Outcome::image("SECOND"), Duration::from_millis(40))
                .then_after(Outcome::image("THIRD"), Duration::from_millis(5)),
        );

        let images = client.generate_variants(&subject(), &request("gold")).await.unwrap();
        assert_eq!(
            images,
            vec!["data:image/png;base64,SECOND".to_string(), "data:image/png;base64,THIRD".to_string()]
        );
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_all_success_returns_three() {
        let (_, client) = client(
            ScriptedModel::new()
                .then_after(Outcome::image("A"), Duration::from_millis(20))
                .then(Outcome::image("B"))
                .then_after(Outcome::image("C"), Duration::from_millis(10)),
        );
        let images = client.generate_variants(&subject(), &request("gold")).await.unwrap();
        assert_eq!(images.len(), 3);
        assert!(images[0].ends_with(",A") && images[1].ends_with(",B") && images[2].ends_with(",C"));
    }

    #[tokio::test]
    async fn test_all_failed_reports_first_reason() {
        let (_, client) = client(
            ScriptedModel::new()
                .then_after(Outcome::Reply(ModelReply::blocked(Some("PROHIBITED_CONTENT"))), Duration::from_millis(30))
                .then(Outcome::Fail("second".into()))
                .then(Outcome::text("no image for you")),
        );

        let err = client.generate_variants(&subject(), &request("gold")).await.unwrap_err();
        assert!(matches!(err, GenerationError::AllVariantsFailed(_)));
        assert_eq!(
            err.to_string(),
            "Image generation was blocked due to safety reasons: PROHIBITED_CONTENT"
        );
    }

    #[tokio::test]
    async fn test_missing_image_part_reason() {
        let (_, client) = client(
            ScriptedModel::new()
                .then(Outcome::text("only words"))
                .then(Outcome::Reply(ModelReply::blocked(None)))
                .then(Outcome::Reply(ModelReply::default())),
        );
        let err = client.generate_variants(&subject(), &request("gold")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "The model did not return an image. Please try a different prompt or image."
        );
    }

    #[tokio::test]
    async fn test_unconfigured_fails_before_any_call() {
        let (model, client) = client(ScriptedModel::unconfigured());
        let err = client.generate_variants(&subject(), &request("gold")).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(_)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_parts_without_style_image() {
        let (model, client) = client(
            ScriptedModel::new()
                .then(Outcome::image("A"))
                .then(Outcome::image("B"))
                .then(Outcome::image("C")),
        );
        let mut req = request("Make it look like a painting");
        req.options.mode = GenerationMode::Cinematic;
        req.options.resolution = Resolution::FourK;
        client.generate_variants(&subject(), &req).await.unwrap();

        let sent = &model.requests()[0];
        assert_eq!(sent.task, ModelTask::Image);
        assert_eq!(sent.parts.len(), 2);
        assert_eq!(sent.parts[0], Part::Image(subject()));
        assert_eq!(
            sent.parts[1],
            Part::Text("Make it look like a painting, a cinematic style, in 4K resolution".into())
        );
    }

    #[tokio::test]
    async fn test_parts_with_style_image_put_style_first() {
        let (model, client) = client(
            ScriptedModel::new()
                .then(Outcome::image("A"))
                .then(Outcome::image("B"))
                .then(Outcome::image("C")),
        );
        let style = inline_image("image/jpeg", b"style");
        let mut req = request("ignored template prompt");
        req.options.mode = GenerationMode::Artistic;
        req.style_image = Some(style.clone());
        client.generate_variants(&subject(), &req).await.unwrap();

        let sent = &model.requests()[2];
        assert_eq!(sent.parts.len(), 3);
        assert_eq!(sent.parts[0], Part::Image(style));
        assert_eq!(sent.parts[1], Part::Image(subject()));
        assert_eq!(sent.parts[2], Part::Text(STYLE_TRANSFER_PROMPT.into()));
    }

    #[tokio::test]
    async fn test_template_idea_parses_json() {
        let (model, client) = client(ScriptedModel::new().then(Outcome::text(
            r#"{"id":"cosmic_dust","name":"Cosmic Dust","prompt":"Transform the person...","thumbnail":"https://picsum.photos/seed/cosmic_dust/200"}"#,
        )));
        let idea = client.generate_template_idea().await.unwrap();
        assert_eq!(idea.id, "cosmic_dust");
        assert!(matches!(model.requests()[0].task, ModelTask::Json { .. }));
    }

    #[tokio::test]
    async fn test_template_idea_rejects_garbage() {
        let (_, client) = client(ScriptedModel::new().then(Outcome::text("not json")));
        assert!(matches!(
            client.generate_template_idea().await,
            Err(GenerationError::InvalidIdea(_))
        ));
    }

    #[tokio::test]
    async fn test_prompt_from_style_image() {
        let (model, client) = client(ScriptedModel::new().then(Outcome::text("  A moody film noir portrait. ")));
        let prompt = client.prompt_from_style_image(&inline_image("image/png", b"s")).await.unwrap();
        assert_eq!(prompt, "A moody film noir portrait.");
        assert_eq!(model.requests()[0].task, ModelTask::Text);
    }

    #[tokio::test]
    async fn test_thumbnail_for_prompt() {
        let (_, client) = client(ScriptedModel::new().then_images(vec![InlineImage {
            mime_type: "image/jpeg".into(),
            data: "QUJD".into(),
        }]));
        assert_eq!(
            client.thumbnail_for_prompt("neon").await.unwrap(),
            "data:image/jpeg;base64,QUJD"
        );
        assert!(matches!(
            client.thumbnail_for_prompt("neon").await,
            Err(GenerationError::NoThumbnail)
        ));
    }
}
