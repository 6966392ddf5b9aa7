//! Styling engine
//!
//! This module contains the building blocks the editor session sequences:
//! - Center-cropping to the selected aspect ratio
//! - Preview handles for processed images
//! - Per-image generation history
//! - The remote generation client and its variant fan-out

mod cropper;
mod generator;
mod history;
mod preview;

pub use cropper::crop_in_background;
pub use generator::{
    inline_image, GenerationClient, GenerationError, GenerationRequest, STYLE_TRANSFER_PROMPT,
};
pub use history::{HistoryQueue, HistoryStore, HistoryTicket, DEFAULT_HISTORY_CAPACITY};
pub use preview::{PreviewRegistry, ProcessedImage};
