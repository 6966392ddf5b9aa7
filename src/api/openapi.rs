//! OpenAPI 3.0 specification definition

use utoipa::OpenApi;

use crate::api::handlers::{
    ApiError, ErrorResponse, SessionResponse,
    health::HealthResponse,
    session::{ImageUpload, OptionsUpdate},
    generate::CustomPromptRequest,
    templates::{TemplatesListResponse, TemplateResponse, ThumbnailRequest, ThumbnailResponse},
    style::StylePromptResponse,
};
use crate::domain::{
    AspectRatio, GenerationMode, GenerationOptions, ImageIdentity, Resolution, Template, TemplateDraft,
};
use crate::session::{SessionSnapshot, SessionStatus};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "R-Image-Styler API",
        version = "1.0.0",
        description = "AI photo styling: upload a selfie, pick a style, get up to three generated variants",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "session", description = "Editor session state"),
        (name = "generate", description = "Variant generation endpoints"),
        (name = "templates", description = "Template management endpoints"),
        (name = "style", description = "Style reference analysis")
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::session::get_session,
        crate::api::handlers::session::reset_session,
        crate::api::handlers::session::upload_image,
        crate::api::handlers::session::update_options,
        crate::api::handlers::session::set_style_image,
        crate::api::handlers::session::clear_style_image,
        crate::api::handlers::session::select_variant,
        crate::api::handlers::session::select_history,
        crate::api::handlers::session::download,
        crate::api::handlers::generate::generate_with_template,
        crate::api::handlers::generate::generate_custom,
        crate::api::handlers::generate::generate_with_style_image,
        crate::api::handlers::generate::regenerate,
        crate::api::handlers::templates::list_templates,
        crate::api::handlers::templates::create_template,
        crate::api::handlers::templates::update_template,
        crate::api::handlers::templates::delete_template,
        crate::api::handlers::templates::generate_idea,
        crate::api::handlers::templates::generate_thumbnail,
        crate::api::handlers::style::analyze_style,
    ),
    components(
        schemas(
            // Shared schemas
            ErrorResponse,
            ApiError,
            SessionResponse,
            HealthResponse,
            // Session schemas
            SessionSnapshot,
            SessionStatus,
            ImageIdentity,
            ImageUpload,
            OptionsUpdate,
            // Generation schemas
            CustomPromptRequest,
            GenerationOptions,
            AspectRatio,
            Resolution,
            GenerationMode,
            // Template schemas
            Template,
            TemplateDraft,
            TemplatesListResponse,
            TemplateResponse,
            ThumbnailRequest,
            ThumbnailResponse,
            StylePromptResponse,
        )
    )
)]
pub struct ApiDoc;
