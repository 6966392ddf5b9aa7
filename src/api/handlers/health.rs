//! Health check endpoint

use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub templates_loaded: usize,
    /// Whether model credentials are present
    pub provider_configured: bool,
    pub image_model: String,
    pub live_previews: usize,
}

/// GET /health - Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        templates_loaded: state.editor.templates().len(),
        provider_configured: state.editor.provider_configured(),
        image_model: state.settings.gemini.image_model.clone(),
        live_previews: state.editor.previews().live(),
    };

    HttpResponse::Ok().json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_support;
    use crate::providers::scripted::ScriptedModel;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_reports_templates_and_provider() {
        let app = test::init_service(
            App::new()
                .app_data(test_support::state(ScriptedModel::unconfigured()))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let response: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(response["status"], "healthy");
        assert_eq!(response["templates_loaded"], 20);
        assert_eq!(response["provider_configured"], false);
        assert_eq!(response["image_model"], "gemini-2.5-flash-image-preview");
        assert_eq!(response["live_previews"], 0);
    }
}
