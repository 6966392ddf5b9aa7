//! Session endpoints: upload, options, style image, selection, download, reset

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::AppState;
use crate::api::handlers::{error_response, session_ok, ErrorResponse, SessionResponse};
use crate::domain::{parse_data_uri, AspectRatio, GenerationMode, ImageDataError, Resolution};
use crate::session::SessionError;

/// Image sent as JSON
#[derive(Debug, Deserialize, ToSchema)]
pub struct ImageUpload {
    /// File name; with the byte size it selects the history bucket
    pub name: String,
    /// `data:<mime>;base64,<payload>` URI or bare base64
    pub data: String,
    /// MIME type for bare base64; sniffed from the bytes when absent
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl ImageUpload {
    fn decode(&self) -> Result<(Option<String>, Bytes), ImageDataError> {
        if self.data.starts_with("data:") {
            let (mime_type, data) = parse_data_uri(&self.data)?;
            return Ok((Some(mime_type), Bytes::from(data)));
        }
        let data = STANDARD.decode(self.data.trim())?;
        Ok((self.mime_type.clone(), Bytes::from(data)))
    }
}

/// Partial options update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OptionsUpdate {
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    #[serde(default)]
    pub mode: Option<GenerationMode>,
}

/// GET /api/v1/session - Current session state
#[utoipa::path(
    get,
    path = "/api/v1/session",
    tag = "session",
    responses(
        (status = 200, description = "Current session state", body = SessionResponse)
    )
)]
pub async fn get_session(state: web::Data<AppState>) -> HttpResponse {
    session_ok(state.editor.snapshot())
}

/// DELETE /api/v1/session - Reset the session
#[utoipa::path(
    delete,
    path = "/api/v1/session",
    tag = "session",
    responses(
        (status = 200, description = "Session reset, image history evicted", body = SessionResponse)
    )
)]
pub async fn reset_session(state: web::Data<AppState>) -> HttpResponse {
    session_ok(state.editor.reset().await)
}

/// POST /api/v1/session/image - Upload the subject image
#[utoipa::path(
    post,
    path = "/api/v1/session/image",
    tag = "session",
    request_body = ImageUpload,
    responses(
        (status = 200, description = "Image uploaded and cropped", body = SessionResponse),
        (status = 400, description = "Invalid or unsupported image", body = ErrorResponse)
    )
)]
pub async fn upload_image(state: web::Data<AppState>, body: web::Json<ImageUpload>) -> HttpResponse {
    let (mime_type, data) = match body.decode() {
        Ok(decoded) => decoded,
        Err(e) => return error_response(SessionError::Image(e)),
    };

    info!(name = %body.name, bytes = data.len(), "Processing image upload");

    match state.editor.upload(&body.name, mime_type.as_deref(), data).await {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/session/options - Update generation options
#[utoipa::path(
    put,
    path = "/api/v1/session/options",
    tag = "session",
    request_body = OptionsUpdate,
    responses(
        (status = 200, description = "Options updated", body = SessionResponse),
        (status = 409, description = "No image or generation in progress", body = ErrorResponse)
    )
)]
pub async fn update_options(state: web::Data<AppState>, body: web::Json<OptionsUpdate>) -> HttpResponse {
    let update = body.into_inner();
    let editor = &state.editor;

    if let Some(resolution) = update.resolution {
        if let Err(e) = editor.set_resolution(resolution) {
            return error_response(e);
        }
    }
    if let Some(mode) = update.mode {
        if let Err(e) = editor.set_mode(mode) {
            return error_response(e);
        }
    }

    let result = match update.aspect_ratio {
        Some(aspect) => editor.set_aspect_ratio(aspect).await,
        None => Ok(editor.snapshot()),
    };

    match result {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/session/style-image - Set the style reference image
#[utoipa::path(
    put,
    path = "/api/v1/session/style-image",
    tag = "session",
    request_body = ImageUpload,
    responses(
        (status = 200, description = "Style image set", body = SessionResponse),
        (status = 400, description = "Invalid or unsupported image", body = ErrorResponse),
        (status = 409, description = "No image or generation in progress", body = ErrorResponse)
    )
)]
pub async fn set_style_image(state: web::Data<AppState>, body: web::Json<ImageUpload>) -> HttpResponse {
    let result = body
        .decode()
        .map_err(SessionError::from)
        .and_then(|(mime_type, data)| state.editor.set_style_image(&body.name, mime_type.as_deref(), data));

    match result {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/session/style-image - Remove the style reference image
#[utoipa::path(
    delete,
    path = "/api/v1/session/style-image",
    tag = "session",
    responses(
        (status = 200, description = "Style image removed", body = SessionResponse),
        (status = 409, description = "No image or generation in progress", body = ErrorResponse)
    )
)]
pub async fn clear_style_image(state: web::Data<AppState>) -> HttpResponse {
    match state.editor.clear_style_image() {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/session/variants/{index} - Select a generated variant
#[utoipa::path(
    post,
    path = "/api/v1/session/variants/{index}",
    tag = "session",
    params(
        ("index" = usize, Path, description = "Zero-based variant index")
    ),
    responses(
        (status = 200, description = "Variant selected", body = SessionResponse),
        (status = 404, description = "No such variant", body = ErrorResponse)
    )
)]
pub async fn select_variant(state: web::Data<AppState>, path: web::Path<usize>) -> HttpResponse {
    match state.editor.select_variant(path.into_inner()) {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/session/history/{index} - Show a history entry
#[utoipa::path(
    post,
    path = "/api/v1/session/history/{index}",
    tag = "session",
    params(
        ("index" = usize, Path, description = "Zero-based history index, 0 is the most recent")
    ),
    responses(
        (status = 200, description = "History entry shown", body = SessionResponse),
        (status = 404, description = "No such history entry", body = ErrorResponse),
        (status = 409, description = "Generation in progress", body = ErrorResponse)
    )
)]
pub async fn select_history(state: web::Data<AppState>, path: web::Path<usize>) -> HttpResponse {
    match state.editor.select_history(path.into_inner()) {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/session/download - Download the selected variant
#[utoipa::path(
    get,
    path = "/api/v1/session/download",
    tag = "session",
    responses(
        (status = 200, description = "Selected image as an attachment", content_type = "image/png"),
        (status = 404, description = "Nothing to download", body = ErrorResponse)
    )
)]
pub async fn download(state: web::Data<AppState>) -> HttpResponse {
    match state.editor.download() {
        Ok(download) => HttpResponse::Ok()
            .content_type(download.mime_type)
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(download.file_name)],
            })
            .body(download.data),
        Err(e) => error_response(e),
    }
}
