//! Uploaded images, history identity and data URI encoding

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// MIME types accepted for subject and style uploads
pub const SUPPORTED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

/// Image payload errors
#[derive(Debug, Error)]
pub enum ImageDataError {
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("Image is empty")]
    Empty,
    #[error("Invalid data URI format. Failed to extract base64 data.")]
    InvalidDataUri,
    #[error("Base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// History identity of an uploaded image: (name, byte size)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ImageIdentity {
    pub name: String,
    pub size: u64,
}

impl ImageIdentity {
    /// Persistent key for this image's history bucket
    pub fn history_key(&self, namespace: &str) -> String {
        format!("{}_{}_{}", namespace, self.name, self.size)
    }
}

/// Raw uploaded image with metadata
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl SourceImage {
    /// Build a source image, sniffing the MIME type when the client sent none
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, data: Bytes) -> Result<Self, ImageDataError> {
        if data.is_empty() {
            return Err(ImageDataError::Empty);
        }

        let mime_type = match mime_type.map(str::trim).filter(|m| !m.is_empty()) {
            Some(mime) => mime.to_ascii_lowercase(),
            None => image::guess_format(&data)
                .map(|format| format.to_mime_type().to_string())
                .unwrap_or_else(|_| "application/octet-stream".to_string()),
        };

        if !SUPPORTED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(ImageDataError::UnsupportedType(mime_type));
        }

        Ok(SourceImage {
            name: name.into(),
            mime_type,
            data,
        })
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn identity(&self) -> ImageIdentity {
        ImageIdentity {
            name: self.name.clone(),
            size: self.size(),
        }
    }
}

/// Encode bytes as a `data:<mime>;base64,<payload>` URI
pub fn to_data_uri(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

/// Split a data URI into its MIME type and decoded bytes
pub fn parse_data_uri(uri: &str) -> Result<(String, Vec<u8>), ImageDataError> {
    let rest = uri.strip_prefix("data:").ok_or(ImageDataError::InvalidDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageDataError::InvalidDataUri)?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or(ImageDataError::InvalidDataUri)?;

    if payload.is_empty() {
        return Err(ImageDataError::InvalidDataUri);
    }

    Ok((mime_type.to_string(), STANDARD.decode(payload)?))
}
