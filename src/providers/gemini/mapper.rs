//! Gemini Data Mapper
//!
//! Converts between provider-neutral requests/replies and the Gemini wire
//! models.

use crate::providers::traits::{ContentRequest, ImagePrompt, InlineImage, ModelReply, ModelTask, Part};

use super::models::*;

/// Mapper for converting to and from Gemini API models
pub struct GeminiMapper;

impl GeminiMapper {
    /// Build a generateContent body for a request
    pub fn to_request(request: &ContentRequest) -> GenerateContentRequest {
        let parts = request.parts.iter().map(Self::to_part).collect();

        let generation_config = match &request.task {
            ModelTask::Image => Some(GenerationConfig {
                response_modalities: Some(vec!["IMAGE".to_string(), "TEXT".to_string()]),
                ..Default::default()
            }),
            ModelTask::Json { schema } => Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema.clone()),
                ..Default::default()
            }),
            ModelTask::Text => None,
        };

        GenerateContentRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config,
        }
    }

    fn to_part(part: &Part) -> GeminiPart {
        match part {
            Part::Text(text) => GeminiPart {
                text: Some(text.clone()),
                inline_data: None,
            },
            Part::Image(image) => GeminiPart {
                text: None,
                inline_data: Some(GeminiBlob {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                }),
            },
        }
    }

    /// Normalize a generateContent response to its first candidate
    pub fn to_reply(response: GenerateContentResponse) -> ModelReply {
        let block_reason = response.prompt_feedback.and_then(|feedback| feedback.block_reason);
        let Some(candidate) = response.candidates.into_iter().next() else {
            return ModelReply {
                finish_reason: None,
                block_reason,
                parts: None,
            };
        };

        let parts = candidate.content.map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| match (part.inline_data, part.text) {
                    (Some(blob), _) if !blob.data.is_empty() => Some(Part::Image(InlineImage {
                        mime_type: blob.mime_type,
                        data: blob.data,
                    })),
                    (_, Some(text)) => Some(Part::Text(text)),
                    _ => None,
                })
                .collect()
        });

        ModelReply {
            finish_reason: candidate.finish_reason,
            block_reason,
            parts,
        }
    }

    pub fn to_predict_request(prompt: &ImagePrompt) -> PredictRequest {
        PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.prompt.clone(),
            }],
            parameters: PredictParameters {
                sample_count: prompt.count.max(1),
                aspect_ratio: prompt.aspect_ratio.clone(),
                output_options: OutputOptions {
                    mime_type: prompt.mime_type.clone(),
                },
            },
        }
    }

    /// Keep predictions that carry bytes; missing MIME falls back to the requested one
    pub fn to_images(response: PredictResponse, requested_mime: &str) -> Vec<InlineImage> {
        response
            .predictions
            .into_iter()
            .filter_map(|prediction| {
                let data = prediction.bytes_base64_encoded.filter(|d| !d.is_empty())?;
                Some(InlineImage {
                    mime_type: prediction.mime_type.unwrap_or_else(|| requested_mime.to_string()),
                    data,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_request_shape() {
        let request = ContentRequest {
            task: ModelTask::Image,
            parts: vec![
                Part::Image(InlineImage { mime_type: "image/png".into(), data: "AAA".into() }),
                Part::Text("make it gold".into()),
            ],
        };
        let body = serde_json::to_value(GeminiMapper::to_request(&request)).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["data"], "AAA");
        assert_eq!(body["contents"][0]["parts"][1]["text"], "make it gold");
        assert_eq!(body["generationConfig"]["responseModalities"], json!(["IMAGE", "TEXT"]));
    }

    #[test]
    fn test_json_and_text_request_config() {
        let json_request = ContentRequest {
            task: ModelTask::Json { schema: json!({"type": "OBJECT"}) },
            parts: vec![Part::Text("idea".into())],
        };
        let body = serde_json::to_value(GeminiMapper::to_request(&json_request)).unwrap();
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");

        let text_request = ContentRequest { task: ModelTask::Text, parts: vec![] };
        let body = serde_json::to_value(GeminiMapper::to_request(&text_request)).unwrap();
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_reply_with_image() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Here it is"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBOR"}}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let reply = GeminiMapper::to_reply(response);
        assert!(!reply.is_withheld());
        assert_eq!(reply.first_image().unwrap().to_data_uri(), "data:image/png;base64,iVBOR");
    }

    #[test]
    fn test_reply_snake_case_inline_data() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"inline_data": {"mime_type": "image/jpeg", "data": "/9j/"}}]}}]
        }))
        .unwrap();
        let reply = GeminiMapper::to_reply(response);
        assert_eq!(reply.first_image().unwrap().mime_type, "image/jpeg");
    }

    #[test]
    fn test_reply_safety_block() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}],
            "promptFeedback": {"blockReason": "OTHER"}
        }))
        .unwrap();
        let reply = GeminiMapper::to_reply(response);
        assert!(reply.is_withheld());
        assert_eq!(reply.block_reason.as_deref(), Some("OTHER"));
    }

    #[test]
    fn test_reply_without_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "PROHIBITED_CONTENT"}})).unwrap();
        let reply = GeminiMapper::to_reply(response);
        assert!(reply.is_withheld());
        assert!(reply.parts.is_none());
    }

    #[test]
    fn test_predict_roundtrip_shapes() {
        let prompt = ImagePrompt {
            prompt: "thumb".into(),
            aspect_ratio: "1:1".into(),
            mime_type: "image/jpeg".into(),
            count: 1,
        };
        let body = serde_json::to_value(GeminiMapper::to_predict_request(&prompt)).unwrap();
        assert_eq!(body["parameters"]["sampleCount"], 1);
        assert_eq!(body["parameters"]["outputOptions"]["mimeType"], "image/jpeg");

        let response: PredictResponse = serde_json::from_value(json!({
            "predictions": [{"bytesBase64Encoded": "QUJD"}, {"mimeType": "image/png"}]
        }))
        .unwrap();
        let images = GeminiMapper::to_images(response, "image/jpeg");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].to_data_uri(), "data:image/jpeg;base64,QUJD");
    }
}
