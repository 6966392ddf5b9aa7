//! Center-crop to a target aspect ratio
//!
//! The shorter side (relative to the target ratio) is kept whole and the
//! longer side is clipped symmetrically around the center.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;
use tracing::debug;

use crate::domain::AspectRatio;

/// JPEG quality used when re-encoding lossy sources
pub const JPEG_QUALITY: u8 = 95;

/// Cropping errors
#[derive(Debug, Error)]
pub enum CropError {
    #[error("The image could not be decoded for cropping: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Failed to encode cropped image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("Crop task failed: {0}")]
    Task(String),
}

/// Source-space rectangle selected for a crop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Encoded result of a crop
#[derive(Debug, Clone)]
pub struct CroppedImage {
    pub data: Bytes,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// Compute the centered crop rectangle for a `width`×`height` source
pub fn crop_region(width: u32, height: u32, aspect: AspectRatio) -> CropRegion {
    let target = aspect.ratio();
    let source = width as f64 / height as f64;

    if source > target {
        let crop_width = ((height as f64 * target).round() as u32).clamp(1, width);
        CropRegion {
            x: (width - crop_width) / 2,
            y: 0,
            width: crop_width,
            height,
        }
    } else {
        let crop_height = ((width as f64 / target).round() as u32).clamp(1, height);
        CropRegion {
            x: 0,
            y: (height - crop_height) / 2,
            width,
            height: crop_height,
        }
    }
}

/// Decode, crop and re-encode an image in its original format
pub fn crop_to_aspect(data: &[u8], mime_type: &str, aspect: AspectRatio) -> Result<CroppedImage, CropError> {
    let decoded = image::load_from_memory(data).map_err(CropError::Decode)?;
    let (width, height) = decoded.dimensions();
    let region = crop_region(width, height, aspect);

    debug!(
        source_width = width,
        source_height = height,
        crop_x = region.x,
        crop_y = region.y,
        crop_width = region.width,
        crop_height = region.height,
        aspect = %aspect,
        "Cropping image"
    );

    let cropped = decoded.crop_imm(region.x, region.y, region.width, region.height);
    let (data, mime_type) = encode_like(&cropped, mime_type)?;

    Ok(CroppedImage {
        data: Bytes::from(data),
        mime_type,
        width: region.width,
        height: region.height,
    })
}

/// Crop on the blocking pool; decoding large photos is CPU-bound
pub async fn crop_in_background(data: Bytes, mime_type: String, aspect: AspectRatio) -> Result<CroppedImage, CropError> {
    tokio::task::spawn_blocking(move || crop_to_aspect(&data, &mime_type, aspect))
        .await
        .map_err(|e| CropError::Task(e.to_string()))?
}

fn encode_like(image: &DynamicImage, mime_type: &str) -> Result<(Vec<u8>, String), CropError> {
    let mut buffer = Cursor::new(Vec::new());

    match ImageFormat::from_mime_type(mime_type) {
        Some(ImageFormat::Jpeg) => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
            rgb.write_with_encoder(encoder).map_err(CropError::Encode)?;
            Ok((buffer.into_inner(), "image/jpeg".to_string()))
        }
        Some(ImageFormat::WebP) => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            rgba.write_to(&mut buffer, ImageFormat::WebP).map_err(CropError::Encode)?;
            Ok((buffer.into_inner(), "image/webp".to_string()))
        }
        _ => {
            image.write_to(&mut buffer, ImageFormat::Png).map_err(CropError::Encode)?;
            Ok((buffer.into_inner(), "image/png".to_string()))
        }
    }
}
