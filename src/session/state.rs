//! Session state machine
//!
//! The whole editor session is one tagged value. Results, errors and the
//! in-flight marker live inside `Phase`, so combinations such as "loading
//! and showing an error" cannot be represented.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{GenerationOptions, ImageIdentity, SourceImage};
use crate::engine::ProcessedImage;

/// Style label used for custom prompts and the style-image path
pub const CUSTOM_STYLE_NAME: &str = "Custom Style";

/// Style label used when a history entry is restored
pub const HISTORY_STYLE_NAME: &str = "From History";

/// Result panel of a session that has an image
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Phase {
    #[default]
    Idle,
    Generating,
    Loaded {
        variants: Vec<String>,
        selected: usize,
        style_name: String,
    },
    Errored {
        message: String,
    },
}

impl Phase {
    pub fn is_generating(&self) -> bool {
        matches!(self, Phase::Generating)
    }

    pub fn selected_image(&self) -> Option<&str> {
        match self {
            Phase::Loaded { variants, selected, .. } => variants.get(*selected).map(String::as_str),
            _ => None,
        }
    }
}

/// What `regenerate` replays
#[derive(Debug, Clone, PartialEq)]
pub struct LastRequest {
    pub base_prompt: String,
    pub style_name: String,
}

/// Everything attached to the currently uploaded image
#[derive(Debug)]
pub struct ActiveImage {
    /// Fresh for every upload
    pub session_id: Uuid,
    pub source: SourceImage,
    /// `None` until the first crop for this image settles
    pub processed: Option<ProcessedImage>,
    /// Bumped whenever a new crop is started; older crops are stale
    pub crop_revision: u64,
    pub options: GenerationOptions,
    pub style_image: Option<SourceImage>,
    pub phase: Phase,
    pub last_request: Option<LastRequest>,
    pub active_template: Option<String>,
    pub history: Vec<String>,
}

impl ActiveImage {
    pub fn new(source: SourceImage, history: Vec<String>) -> Self {
        ActiveImage {
            session_id: Uuid::new_v4(),
            source,
            processed: None,
            crop_revision: 0,
            options: GenerationOptions::default(),
            style_image: None,
            phase: Phase::Idle,
            last_request: None,
            active_template: None,
            history,
        }
    }

    pub fn identity(&self) -> ImageIdentity {
        self.source.identity()
    }

    /// Drop results and the prompt they came from
    pub fn clear_results(&mut self) {
        self.phase = Phase::Idle;
        self.active_template = None;
        self.last_request = None;
    }
}

#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Empty,
    HasImage(Box<ActiveImage>),
}

impl SessionState {
    pub fn active(&self) -> Option<&ActiveImage> {
        match self {
            SessionState::Empty => None,
            SessionState::HasImage(active) => Some(active),
        }
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveImage> {
        match self {
            SessionState::Empty => None,
            SessionState::HasImage(active) => Some(active),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.active().is_some_and(|active| active.phase.is_generating())
    }
}

/// Coarse session status reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Empty,
    Idle,
    Generating,
    Loaded,
    Errored,
}

/// Read-only view of the session
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub session_id: Option<Uuid>,
    pub image: Option<ImageIdentity>,
    /// Data URI of the image sent to the model
    pub processed_image: Option<String>,
    /// True when cropping failed and the upload is used as-is
    pub processed_uncropped: bool,
    pub options: GenerationOptions,
    pub has_style_image: bool,
    pub variants: Vec<String>,
    pub selected_index: Option<usize>,
    pub selected_image: Option<String>,
    pub style_name: Option<String>,
    pub error: Option<String>,
    pub active_template_id: Option<String>,
    pub last_prompt: Option<String>,
    pub history: Vec<String>,
    pub generating_idea: bool,
}

impl SessionSnapshot {
    pub fn capture(state: &SessionState, generating_idea: bool) -> Self {
        let Some(active) = state.active() else {
            return SessionSnapshot {
                status: SessionStatus::Empty,
                session_id: None,
                image: None,
                processed_image: None,
                processed_uncropped: false,
                options: GenerationOptions::default(),
                has_style_image: false,
                variants: Vec::new(),
                selected_index: None,
                selected_image: None,
                style_name: None,
                error: None,
                active_template_id: None,
                last_prompt: None,
                history: Vec::new(),
                generating_idea,
            };
        };

        let (status, variants, selected_index, style_name, error) = match &active.phase {
            Phase::Idle => (SessionStatus::Idle, Vec::new(), None, None, None),
            Phase::Generating => (SessionStatus::Generating, Vec::new(), None, None, None),
            Phase::Loaded {
                variants,
                selected,
                style_name,
            } => (
                SessionStatus::Loaded,
                variants.clone(),
                Some(*selected),
                Some(style_name.clone()),
                None,
            ),
            Phase::Errored { message } => (SessionStatus::Errored, Vec::new(), None, None, Some(message.clone())),
        };

        SessionSnapshot {
            status,
            session_id: Some(active.session_id),
            image: Some(active.identity()),
            processed_image: active.processed.as_ref().map(ProcessedImage::data_uri),
            processed_uncropped: active.processed.as_ref().is_some_and(|p| p.uncropped),
            options: active.options,
            has_style_image: active.style_image.is_some(),
            selected_image: active.phase.selected_image().map(str::to_string),
            variants,
            selected_index,
            style_name,
            error,
            active_template_id: active.active_template.clone(),
            last_prompt: active.last_request.as_ref().map(|r| r.base_prompt.clone()),
            history: active.history.clone(),
            generating_idea,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn active() -> ActiveImage {
        let source = SourceImage::new("me.png", Some("image/png"), Bytes::from_static(b"png")).unwrap();
        ActiveImage::new(source, vec!["data:image/png;base64,AAA".to_string()])
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = SessionSnapshot::capture(&SessionState::Empty, false);
        assert_eq!(snapshot.status, SessionStatus::Empty);
        assert!(snapshot.image.is_none());
        assert!(snapshot.history.is_empty());
    }

    #[test]
    fn test_loaded_snapshot_reports_selection() {
        let mut image = active();
        image.phase = Phase::Loaded {
            variants: vec!["a".into(), "b".into()],
            selected: 1,
            style_name: "Neon".into(),
        };
        let snapshot = SessionSnapshot::capture(&SessionState::HasImage(Box::new(image)), false);

        assert_eq!(snapshot.status, SessionStatus::Loaded);
        assert_eq!(snapshot.selected_image.as_deref(), Some("b"));
        assert_eq!(snapshot.style_name.as_deref(), Some("Neon"));
        assert_eq!(snapshot.image.map(|i| i.size), Some(3));
        assert_eq!(snapshot.history.len(), 1);
    }

    #[test]
    fn test_clear_results() {
        let mut image = active();
        image.phase = Phase::Errored { message: "boom".into() };
        image.active_template = Some("neon".into());
        image.last_request = Some(LastRequest {
            base_prompt: "p".into(),
            style_name: "Neon".into(),
        });

        image.clear_results();
        assert_eq!(image.phase, Phase::Idle);
        assert!(image.active_template.is_none() && image.last_request.is_none());
    }
}
