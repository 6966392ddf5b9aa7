//! Processed-image artifacts and their preview handles
//!
//! Every processed image owns a `PreviewHandle` issued by a shared
//! `PreviewRegistry`. The handle is released when the artifact is dropped,
//! so replacing or discarding a processed image always frees its preview.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::domain::to_data_uri;

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: AtomicUsize,
}

/// Issues preview handles and tracks how many are alive
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<RegistryInner>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> PreviewHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.live.fetch_add(1, Ordering::AcqRel);
        debug!(preview_id = id, "Acquired preview handle");
        PreviewHandle {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Number of handles not yet released
    pub fn live(&self) -> usize {
        self.inner.live.load(Ordering::Acquire)
    }
}

/// Scoped preview resource, released on drop
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    registry: Arc<RegistryInner>,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.live.fetch_sub(1, Ordering::AcqRel);
        debug!(preview_id = self.id, "Released preview handle");
    }
}

/// The subject image actually sent to the model
#[derive(Debug)]
pub struct ProcessedImage {
    pub data: Bytes,
    pub mime_type: String,
    /// True when cropping failed and the original upload is used as-is
    pub uncropped: bool,
    preview: PreviewHandle,
}

impl ProcessedImage {
    pub fn new(data: Bytes, mime_type: String, uncropped: bool, registry: &PreviewRegistry) -> Self {
        ProcessedImage {
            data,
            mime_type,
            uncropped,
            preview: registry.acquire(),
        }
    }

    pub fn preview_id(&self) -> u64 {
        self.preview.id()
    }

    pub fn data_uri(&self) -> String {
        to_data_uri(&self.mime_type, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_released_on_drop() {
        let registry = PreviewRegistry::new();
        let first = ProcessedImage::new(Bytes::from_static(b"a"), "image/png".into(), false, &registry);
        assert_eq!(registry.live(), 1);

        let mut current = Some(first);
        for _ in 0..5 {
            // replacing the artifact drops the superseded one
            current = Some(ProcessedImage::new(Bytes::from_static(b"b"), "image/png".into(), false, &registry));
            assert_eq!(registry.live(), 1);
        }

        assert_eq!(current.as_ref().map(|p| p.preview_id()), Some(6));
        drop(current);
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_data_uri() {
        let registry = PreviewRegistry::new();
        let image = ProcessedImage::new(Bytes::from_static(b"abc"), "image/png".into(), true, &registry);
        assert_eq!(image.data_uri(), "data:image/png;base64,YWJj");
        assert!(image.uncropped);
    }
}
