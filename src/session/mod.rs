//! Editor session
//!
//! Owns the single-user session state machine and sequences
//! crop → generate → history update on top of the engine.

mod editor;
mod state;

use thiserror::Error;

use crate::domain::{ImageDataError, TemplateError};
use crate::engine::GenerationError;

pub use editor::{Download, Editor};
pub use state::{SessionSnapshot, SessionStatus};

/// Session operation errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No image has been uploaded")]
    NoImage,

    #[error("Another generation is in progress")]
    Busy,

    #[error("No style reference image is set")]
    NoStyleImage,

    #[error("There is no previous prompt to regenerate")]
    NothingToRegenerate,

    #[error("There is no generated image to download")]
    NothingToDownload,

    #[error("No variant at index {0}")]
    VariantOutOfRange(usize),

    #[error("No history entry at index {0}")]
    HistoryOutOfRange(usize),

    #[error("Please enter a prompt first")]
    EmptyPrompt,

    #[error(transparent)]
    Image(#[from] ImageDataError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Session task failed: {0}")]
    Task(String),
}
