//! Editor orchestrator
//!
//! All state changes happen under one `parking_lot` mutex at well-defined
//! begin/complete points; the lock is never held across an await. Remote
//! work runs in a spawned task so a dropped caller cannot strand the session
//! in `Generating`, and every result is checked against the session epoch
//! before it is applied.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    download_file_name, parse_data_uri, AspectRatio, GenerationMode, GenerationOptions, Resolution, SourceImage,
    Template, TemplateCatalog, TemplateDraft, TemplateError,
};
use crate::engine::{
    crop_in_background, inline_image, GenerationClient, GenerationError, GenerationRequest, HistoryQueue, HistoryStore,
    HistoryTicket, PreviewRegistry, ProcessedImage, STYLE_TRANSFER_PROMPT,
};
use crate::providers::InlineImage;

use super::state::{
    ActiveImage, LastRequest, Phase, SessionSnapshot, SessionState, CUSTOM_STYLE_NAME, HISTORY_STYLE_NAME,
};
use super::SessionError;

struct Inner {
    state: SessionState,
    templates: TemplateCatalog,
    /// Bumped on upload and reset
    epoch: u64,
    /// Independent of the image; survives upload and reset
    idea_in_flight: bool,
}

/// The selected variant, decoded for download
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A crop started for a specific image and aspect ratio
struct CropJob {
    epoch: u64,
    revision: u64,
    data: Bytes,
    mime_type: String,
    aspect: AspectRatio,
}

impl CropJob {
    fn start(epoch: u64, active: &mut ActiveImage) -> Self {
        active.crop_revision += 1;
        CropJob {
            epoch,
            revision: active.crop_revision,
            data: active.source.data.clone(),
            mime_type: active.source.mime_type.clone(),
            aspect: active.options.aspect_ratio,
        }
    }
}

/// How a generation affects the active template
enum TemplateChoice {
    Set(String),
    Clear,
    Keep,
}

struct PendingGeneration {
    epoch: u64,
    subject: InlineImage,
    request: GenerationRequest,
    style_name: String,
}

/// Single-user editor session
#[derive(Clone)]
pub struct Editor {
    inner: Arc<Mutex<Inner>>,
    history: HistoryQueue,
    previews: PreviewRegistry,
    generator: GenerationClient,
}

impl Editor {
    pub fn new(generator: GenerationClient, history: HistoryStore) -> Self {
        Editor {
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Empty,
                templates: TemplateCatalog::default(),
                epoch: 0,
                idea_in_flight: false,
            })),
            history: HistoryQueue::spawn(history),
            previews: PreviewRegistry::new(),
            generator,
        }
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn provider_configured(&self) -> bool {
        self.generator.is_configured()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot::capture(&inner.state, inner.idea_in_flight)
    }

    // ------------------------------------------------------------------
    // Image lifecycle
    // ------------------------------------------------------------------

    /// Replace the session with a new image: full reset, then set
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn upload(&self, name: &str, mime_type: Option<&str>, data: Bytes) -> Result<SessionSnapshot, SessionError> {
        let source = SourceImage::new(name, mime_type, data)?;

        // queued behind the eviction of the previous image's bucket
        let (epoch, loading) = {
            let mut inner = self.inner.lock();
            let _evicted = self.reset_locked(&mut inner);
            (inner.epoch, self.history.load(source.identity()))
        };
        let history = loading.wait().await;

        let job = {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                debug!(image = %source.name, "Upload superseded by a newer upload or reset");
                return Ok(SessionSnapshot::capture(&inner.state, inner.idea_in_flight));
            }

            info!(
                image = %source.name,
                size = source.size(),
                mime_type = %source.mime_type,
                history_entries = history.len(),
                "Image uploaded"
            );

            let mut active = Box::new(ActiveImage::new(source, history));
            let job = CropJob::start(inner.epoch, &mut active);
            inner.state = SessionState::HasImage(active);
            job
        };

        self.run_crop(job).await
    }

    /// Return to the initial state and evict the abandoned image's history
    pub async fn reset(&self) -> SessionSnapshot {
        let (evicted, snapshot) = {
            let mut inner = self.inner.lock();
            let evicted = self.reset_locked(&mut inner);
            (evicted, SessionSnapshot::capture(&inner.state, inner.idea_in_flight))
        };
        if let Some(evicted) = evicted {
            evicted.wait().await;
        }
        snapshot
    }

    fn reset_locked(&self, inner: &mut Inner) -> Option<HistoryTicket> {
        let evicted = inner.state.active().map(|active| {
            let identity = active.identity();
            info!(image = %identity.name, size = identity.size, "Session reset");
            self.history.clear(identity)
        });
        // dropping the old state releases its preview handle
        inner.state = SessionState::Empty;
        inner.epoch += 1;
        evicted
    }

    async fn run_crop(&self, job: CropJob) -> Result<SessionSnapshot, SessionError> {
        let editor = self.clone();
        detach(async move { editor.crop_and_apply(job).await }).await
    }

    async fn crop_and_apply(&self, job: CropJob) -> SessionSnapshot {
        let (data, mime_type, uncropped) =
            match crop_in_background(job.data.clone(), job.mime_type.clone(), job.aspect).await {
                Ok(cropped) => (cropped.data, cropped.mime_type, false),
                Err(e) => {
                    warn!(error = %e, "Failed to crop image, using the original");
                    (job.data, job.mime_type, true)
                }
            };

        let mut inner = self.inner.lock();
        let epoch = inner.epoch;
        match inner.state.active_mut() {
            Some(active) if epoch == job.epoch && active.crop_revision == job.revision => {
                let processed = ProcessedImage::new(data, mime_type, uncropped, &self.previews);
                debug!(aspect = %job.aspect, uncropped, preview_id = processed.preview_id(), "Applied processed image");
                active.processed = Some(processed);
            }
            _ => debug!(aspect = %job.aspect, "Discarding stale crop result"),
        }
        SessionSnapshot::capture(&inner.state, inner.idea_in_flight)
    }

    // ------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------

    /// Options and the style image are only editable with an image and no work in flight
    fn editable(inner: &mut Inner) -> Result<&mut ActiveImage, SessionError> {
        let idea_in_flight = inner.idea_in_flight;
        let active = inner.state.active_mut().ok_or(SessionError::NoImage)?;
        if idea_in_flight || active.phase.is_generating() {
            return Err(SessionError::Busy);
        }
        Ok(active)
    }

    /// Change the aspect ratio and re-crop the source
    pub async fn set_aspect_ratio(&self, aspect: AspectRatio) -> Result<SessionSnapshot, SessionError> {
        let job = {
            let mut inner = self.inner.lock();
            let epoch = inner.epoch;
            let active = Self::editable(&mut inner)?;
            if active.options.aspect_ratio == aspect && active.processed.is_some() {
                None
            } else {
                active.options.aspect_ratio = aspect;
                Some(CropJob::start(epoch, active))
            }
        };

        match job {
            Some(job) => self.run_crop(job).await,
            None => Ok(self.snapshot()),
        }
    }

    pub fn set_resolution(&self, resolution: Resolution) -> Result<SessionSnapshot, SessionError> {
        self.update_options(|options| options.resolution = resolution)
    }

    pub fn set_mode(&self, mode: GenerationMode) -> Result<SessionSnapshot, SessionError> {
        self.update_options(|options| options.mode = mode)
    }

    fn update_options(&self, apply: impl FnOnce(&mut GenerationOptions)) -> Result<SessionSnapshot, SessionError> {
        let mut inner = self.inner.lock();
        let active = Self::editable(&mut inner)?;
        apply(&mut active.options);
        Ok(SessionSnapshot::capture(&inner.state, inner.idea_in_flight))
    }

    pub fn set_style_image(&self, name: &str, mime_type: Option<&str>, data: Bytes) -> Result<SessionSnapshot, SessionError> {
        let style = SourceImage::new(name, mime_type, data)?;
        let mut inner = self.inner.lock();
        let active = Self::editable(&mut inner)?;
        debug!(style_image = %style.name, size = style.size(), "Style image set");
        active.style_image = Some(style);
        Ok(SessionSnapshot::capture(&inner.state, inner.idea_in_flight))
    }

    pub fn clear_style_image(&self) -> Result<SessionSnapshot, SessionError> {
        let mut inner = self.inner.lock();
        Self::editable(&mut inner)?.style_image = None;
        Ok(SessionSnapshot::capture(&inner.state, inner.idea_in_flight))
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Generate with a catalog template's prompt
    pub async fn select_template(&self, template_id: &str) -> Result<SessionSnapshot, SessionError> {
        let template = self
            .inner
            .lock()
            .templates
            .get(template_id)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(template_id.to_string()))?;

        self.generate(template.prompt, template.name, TemplateChoice::Set(template.id))
            .await
    }

    /// Generate with free-form text; blank text is ignored
    pub async fn submit_custom_prompt(&self, prompt: &str) -> Result<SessionSnapshot, SessionError> {
        if prompt.trim().is_empty() {
            return Ok(self.snapshot());
        }
        self.generate(prompt.to_string(), CUSTOM_STYLE_NAME.to_string(), TemplateChoice::Clear)
            .await
    }

    /// Place the subject into the style reference image
    pub async fn generate_with_style_image(&self) -> Result<SessionSnapshot, SessionError> {
        {
            let inner = self.inner.lock();
            let active = inner.state.active().ok_or(SessionError::NoImage)?;
            if active.style_image.is_none() {
                return Err(SessionError::NoStyleImage);
            }
        }
        self.generate(
            STYLE_TRANSFER_PROMPT.to_string(),
            CUSTOM_STYLE_NAME.to_string(),
            TemplateChoice::Clear,
        )
        .await
    }

    /// Replay the last base prompt and style label
    pub async fn regenerate(&self) -> Result<SessionSnapshot, SessionError> {
        let last = {
            let inner = self.inner.lock();
            let active = inner.state.active().ok_or(SessionError::NoImage)?;
            active.last_request.clone().ok_or(SessionError::NothingToRegenerate)?
        };
        self.generate(last.base_prompt, last.style_name, TemplateChoice::Keep)
            .await
    }

    async fn generate(
        &self,
        base_prompt: String,
        style_name: String,
        template: TemplateChoice,
    ) -> Result<SessionSnapshot, SessionError> {
        let pending = {
            let mut inner = self.inner.lock();
            Self::begin_generation(&mut inner, base_prompt, style_name, template)
        };

        let Some(pending) = pending else {
            return Ok(self.snapshot());
        };

        let editor = self.clone();
        detach(async move { editor.complete_generation(pending).await }).await
    }

    /// Enter `Generating`, or `None` when a generation cannot start
    fn begin_generation(
        inner: &mut Inner,
        base_prompt: String,
        style_name: String,
        template: TemplateChoice,
    ) -> Option<PendingGeneration> {
        let epoch = inner.epoch;
        let idea_in_flight = inner.idea_in_flight;
        let active = inner.state.active_mut()?;

        if idea_in_flight || active.phase.is_generating() {
            debug!("Generation already in progress, ignoring request");
            return None;
        }
        let Some(processed) = active.processed.as_ref() else {
            debug!("Processed image not ready, ignoring request");
            return None;
        };

        let subject = inline_image(&processed.mime_type, &processed.data);
        let request = GenerationRequest {
            base_prompt: base_prompt.clone(),
            options: active.options,
            style_image: active
                .style_image
                .as_ref()
                .map(|style| inline_image(&style.mime_type, &style.data)),
        };

        match template {
            TemplateChoice::Set(id) => active.active_template = Some(id),
            TemplateChoice::Clear => active.active_template = None,
            TemplateChoice::Keep => {}
        }
        active.last_request = Some(LastRequest {
            base_prompt,
            style_name: style_name.clone(),
        });
        active.phase = Phase::Generating;

        info!(
            style_name = %style_name,
            template_id = ?active.active_template,
            options = ?active.options,
            "Generation started"
        );

        Some(PendingGeneration {
            epoch,
            subject,
            request,
            style_name,
        })
    }

    async fn complete_generation(&self, pending: PendingGeneration) -> SessionSnapshot {
        let outcome = self
            .generator
            .generate_variants(&pending.subject, &pending.request)
            .await;

        let (recorded, snapshot) = {
            let mut inner = self.inner.lock();
            let recorded = self.apply_generation(&mut inner, pending, outcome);
            (recorded, SessionSnapshot::capture(&inner.state, inner.idea_in_flight))
        };

        if let Some(recorded) = recorded {
            recorded.wait().await;
        }
        snapshot
    }

    /// Returns the pending history write when a result was applied
    fn apply_generation(
        &self,
        inner: &mut Inner,
        pending: PendingGeneration,
        outcome: Result<Vec<String>, GenerationError>,
    ) -> Option<HistoryTicket> {
        let epoch = inner.epoch;
        let active = match inner.state.active_mut() {
            Some(active) if epoch == pending.epoch && active.phase.is_generating() => active,
            _ => {
                debug!("Discarding stale generation result");
                return None;
            }
        };

        match outcome {
            Ok(variants) => {
                let recorded = variants.first().map(|first| {
                    active.history.insert(0, first.clone());
                    active.history.truncate(self.history.capacity());
                    self.history.record(active.identity(), first.clone())
                });
                info!(variants = variants.len(), style_name = %pending.style_name, "Generation completed");
                active.phase = Phase::Loaded {
                    variants,
                    selected: 0,
                    style_name: pending.style_name,
                };
                recorded
            }
            Err(e) => {
                warn!(error = %e, "Generation failed");
                active.phase = Phase::Errored { message: e.to_string() };
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    pub fn select_variant(&self, index: usize) -> Result<SessionSnapshot, SessionError> {
        let mut inner = self.inner.lock();
        let active = inner.state.active_mut().ok_or(SessionError::NoImage)?;
        match &mut active.phase {
            Phase::Loaded { variants, selected, .. } if index < variants.len() => *selected = index,
            _ => return Err(SessionError::VariantOutOfRange(index)),
        }
        Ok(SessionSnapshot::capture(&inner.state, inner.idea_in_flight))
    }

    /// Show a history entry as the only variant, without a remote call
    pub fn select_history(&self, index: usize) -> Result<SessionSnapshot, SessionError> {
        let mut inner = self.inner.lock();
        let active = Self::editable(&mut inner)?;
        let entry = active
            .history
            .get(index)
            .cloned()
            .ok_or(SessionError::HistoryOutOfRange(index))?;

        active.phase = Phase::Loaded {
            variants: vec![entry],
            selected: 0,
            style_name: HISTORY_STYLE_NAME.to_string(),
        };
        Ok(SessionSnapshot::capture(&inner.state, inner.idea_in_flight))
    }

    pub fn download(&self) -> Result<Download, SessionError> {
        let inner = self.inner.lock();
        let active = inner.state.active().ok_or(SessionError::NothingToDownload)?;
        let selected = active.phase.selected_image().ok_or(SessionError::NothingToDownload)?;
        let (mime_type, data) = parse_data_uri(selected)?;

        Ok(Download {
            file_name: download_file_name(active.active_template.as_deref()),
            mime_type,
            data,
        })
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    pub fn templates(&self) -> Vec<Template> {
        self.inner.lock().templates.list().to_vec()
    }

    pub fn create_template(&self, draft: TemplateDraft) -> Result<Template, SessionError> {
        let template = self.inner.lock().templates.create(draft)?;
        info!(template_id = %template.id, "Template created");
        Ok(template)
    }

    pub fn update_template(&self, id: &str, draft: TemplateDraft) -> Result<Template, SessionError> {
        let template = self.inner.lock().templates.update(id, draft)?;
        info!(template_id = %template.id, "Template updated");
        Ok(template)
    }

    /// Delete a template; deleting the active one clears its results
    pub fn delete_template(&self, id: &str) -> Result<SessionSnapshot, SessionError> {
        let mut inner = self.inner.lock();
        inner.templates.delete(id)?;
        info!(template_id = %id, "Template deleted");

        if let Some(active) = inner.state.active_mut() {
            if active.active_template.as_deref() == Some(id) {
                if active.phase.is_generating() {
                    active.active_template = None;
                    active.last_request = None;
                } else {
                    active.clear_results();
                }
            }
        }
        Ok(SessionSnapshot::capture(&inner.state, inner.idea_in_flight))
    }

    /// Ask the model for a new template and prepend it to the catalog
    pub async fn generate_idea(&self) -> Result<Template, SessionError> {
        {
            let mut inner = self.inner.lock();
            if inner.idea_in_flight || inner.state.is_generating() {
                return Err(SessionError::Busy);
            }
            inner.idea_in_flight = true;
        }

        let editor = self.clone();
        detach(async move { editor.complete_idea().await }).await?
    }

    async fn complete_idea(&self) -> Result<Template, SessionError> {
        let outcome = self.generator.generate_template_idea().await;

        let mut inner = self.inner.lock();
        inner.idea_in_flight = false;
        let template = inner.templates.push_suggested(outcome?)?;
        info!(template_id = %template.id, "Suggested template added");
        Ok(template)
    }

    /// Describe the current style reference image as a prompt
    pub async fn analyze_style_image(&self) -> Result<String, SessionError> {
        let style = {
            let inner = self.inner.lock();
            let active = inner.state.active().ok_or(SessionError::NoImage)?;
            let style = active.style_image.as_ref().ok_or(SessionError::NoStyleImage)?;
            inline_image(&style.mime_type, &style.data)
        };
        Ok(self.generator.prompt_from_style_image(&style).await?)
    }

    /// Generate a thumbnail data URI for a template prompt
    pub async fn thumbnail_for_prompt(&self, prompt: &str) -> Result<String, SessionError> {
        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyPrompt);
        }
        Ok(self.generator.thumbnail_for_prompt(prompt.trim()).await?)
    }
}

/// Run to completion even if the caller goes away
async fn detach<T, F>(task: F) -> Result<T, SessionError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| SessionError::Task(e.to_string()))
}
