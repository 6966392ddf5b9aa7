//! Template management endpoints

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::AppState;
use crate::api::handlers::{error_response, session_ok, ErrorResponse, SessionResponse};
use crate::domain::{Template, TemplateDraft};

/// Response for listing templates
#[derive(Serialize, ToSchema)]
pub struct TemplatesListResponse {
    pub success: bool,
    pub data: Vec<Template>,
    pub count: usize,
}

/// Response for a single template
#[derive(Serialize, ToSchema)]
pub struct TemplateResponse {
    pub success: bool,
    pub data: Template,
}

/// Request body for thumbnail generation
#[derive(Debug, Deserialize, ToSchema)]
pub struct ThumbnailRequest {
    pub prompt: String,
}

/// Generated thumbnail
#[derive(Serialize, ToSchema)]
pub struct ThumbnailResponse {
    pub success: bool,
    /// `data:image/jpeg;base64,...`
    pub thumbnail: String,
}

/// GET /api/v1/templates - List the session's templates
#[utoipa::path(
    get,
    path = "/api/v1/templates",
    tag = "templates",
    responses(
        (status = 200, description = "Templates, newest first", body = TemplatesListResponse)
    )
)]
pub async fn list_templates(state: web::Data<AppState>) -> HttpResponse {
    let data = state.editor.templates();
    let count = data.len();
    info!(count = count, "Retrieved templates list");

    HttpResponse::Ok().json(TemplatesListResponse {
        success: true,
        data,
        count,
    })
}

/// POST /api/v1/templates - Create a template
#[utoipa::path(
    post,
    path = "/api/v1/templates",
    tag = "templates",
    request_body = TemplateDraft,
    responses(
        (status = 201, description = "Template created", body = TemplateResponse),
        (status = 400, description = "Name or prompt missing", body = ErrorResponse),
        (status = 409, description = "Template id already exists", body = ErrorResponse)
    )
)]
pub async fn create_template(state: web::Data<AppState>, body: web::Json<TemplateDraft>) -> HttpResponse {
    match state.editor.create_template(body.into_inner()) {
        Ok(template) => HttpResponse::Created().json(TemplateResponse {
            success: true,
            data: template,
        }),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/templates/{template_id} - Edit a template
#[utoipa::path(
    put,
    path = "/api/v1/templates/{template_id}",
    tag = "templates",
    params(
        ("template_id" = String, Path, description = "Template identifier")
    ),
    request_body = TemplateDraft,
    responses(
        (status = 200, description = "Template updated", body = TemplateResponse),
        (status = 400, description = "Name or prompt missing", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn update_template(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<TemplateDraft>,
) -> HttpResponse {
    match state.editor.update_template(&path.into_inner(), body.into_inner()) {
        Ok(template) => HttpResponse::Ok().json(TemplateResponse {
            success: true,
            data: template,
        }),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/templates/{template_id} - Delete a template
#[utoipa::path(
    delete,
    path = "/api/v1/templates/{template_id}",
    tag = "templates",
    params(
        ("template_id" = String, Path, description = "Template identifier")
    ),
    responses(
        (status = 200, description = "Template deleted, session returned", body = SessionResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn delete_template(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match state.editor.delete_template(&path.into_inner()) {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/templates/idea - Ask the model for a new template
#[utoipa::path(
    post,
    path = "/api/v1/templates/idea",
    tag = "templates",
    responses(
        (status = 201, description = "Suggested template added", body = TemplateResponse),
        (status = 409, description = "A generation is in progress", body = ErrorResponse),
        (status = 502, description = "Model call failed", body = ErrorResponse)
    )
)]
pub async fn generate_idea(state: web::Data<AppState>) -> HttpResponse {
    match state.editor.generate_idea().await {
        Ok(template) => HttpResponse::Created().json(TemplateResponse {
            success: true,
            data: template,
        }),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/templates/thumbnail - Generate a thumbnail for a prompt
#[utoipa::path(
    post,
    path = "/api/v1/templates/thumbnail",
    tag = "templates",
    request_body = ThumbnailRequest,
    responses(
        (status = 200, description = "Thumbnail generated", body = ThumbnailResponse),
        (status = 400, description = "Prompt missing", body = ErrorResponse),
        (status = 502, description = "Model call failed", body = ErrorResponse)
    )
)]
pub async fn generate_thumbnail(state: web::Data<AppState>, body: web::Json<ThumbnailRequest>) -> HttpResponse {
    match state.editor.thumbnail_for_prompt(&body.prompt).await {
        Ok(thumbnail) => HttpResponse::Ok().json(ThumbnailResponse {
            success: true,
            thumbnail,
        }),
        Err(e) => error_response(e),
    }
}
