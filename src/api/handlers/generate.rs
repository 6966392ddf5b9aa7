//! Variant generation endpoints
//!
//! A guarded request (generation already running, idea in flight, image not
//! processed yet) is a no-op and returns the unchanged session. A total
//! failure is not an HTTP error: the session moves to `errored` and the
//! message is part of the returned state.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::time::Instant;
use tracing::info;
use utoipa::ToSchema;

use crate::AppState;
use crate::api::handlers::{error_response, session_ok, ErrorResponse, SessionResponse};

/// Request body for a free-form prompt
#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomPromptRequest {
    /// Style description; blank prompts are ignored
    pub prompt: String,
}

/// POST /api/v1/generate/template/{template_id} - Generate with a template
#[utoipa::path(
    post,
    path = "/api/v1/generate/template/{template_id}",
    tag = "generate",
    params(
        ("template_id" = String, Path, description = "Template identifier (e.g., 'porcelain_doll')")
    ),
    responses(
        (status = 200, description = "Session after generation", body = SessionResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn generate_with_template(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let template_id = path.into_inner();
    let start = Instant::now();

    let result = state.editor.select_template(&template_id).await;
    info!(
        template_id = %template_id,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Template generation request finished"
    );

    match result {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/generate/custom - Generate with a custom prompt
#[utoipa::path(
    post,
    path = "/api/v1/generate/custom",
    tag = "generate",
    request_body = CustomPromptRequest,
    responses(
        (status = 200, description = "Session after generation", body = SessionResponse)
    )
)]
pub async fn generate_custom(state: web::Data<AppState>, body: web::Json<CustomPromptRequest>) -> HttpResponse {
    match state.editor.submit_custom_prompt(&body.prompt).await {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/generate/style-image - Place the subject into the style image
#[utoipa::path(
    post,
    path = "/api/v1/generate/style-image",
    tag = "generate",
    responses(
        (status = 200, description = "Session after generation", body = SessionResponse),
        (status = 409, description = "No image or no style image", body = ErrorResponse)
    )
)]
pub async fn generate_with_style_image(state: web::Data<AppState>) -> HttpResponse {
    match state.editor.generate_with_style_image().await {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/generate/regenerate - Replay the last prompt
#[utoipa::path(
    post,
    path = "/api/v1/generate/regenerate",
    tag = "generate",
    responses(
        (status = 200, description = "Session after generation", body = SessionResponse),
        (status = 409, description = "No image or nothing to regenerate", body = ErrorResponse)
    )
)]
pub async fn regenerate(state: web::Data<AppState>) -> HttpResponse {
    match state.editor.regenerate().await {
        Ok(snapshot) => session_ok(snapshot),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_support;
    use crate::domain::parse_data_uri;
    use crate::providers::scripted::{Outcome, ScriptedModel};
    use actix_web::{test, App};
    use bytes::Bytes;
    use serde_json::json;

    fn routes(cfg: &mut web::ServiceConfig) {
        cfg.route("/api/v1/generate/template/{template_id}", web::post().to(generate_with_template))
            .route("/api/v1/generate/custom", web::post().to(generate_custom))
            .route("/api/v1/generate/style-image", web::post().to(generate_with_style_image))
            .route("/api/v1/generate/regenerate", web::post().to(regenerate));
    }

    async fn uploaded(model: ScriptedModel) -> web::Data<AppState> {
        let state = test_support::state(model);
        let (_, data) = parse_data_uri(&test_support::png_data_uri(12, 12)).unwrap();
        state.editor.upload("me.png", Some("image/png"), Bytes::from(data)).await.unwrap();
        state
    }

    #[actix_web::test]
    async fn test_template_generation_partial_success() {
        let state = uploaded(
            ScriptedModel::new()
                .then(Outcome::image("QUJD"))
                .then(Outcome::Fail("overloaded".into()))
                .then(Outcome::image("R0hJ")),
        )
        .await;
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        let request = test::TestRequest::post()
            .uri("/api/v1/generate/template/porcelain_doll")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "loaded");
        assert_eq!(body["data"]["variants"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["data"]["active_template_id"], "porcelain_doll");
        assert_eq!(body["data"]["history"][0], "data:image/png;base64,QUJD");
    }

    #[actix_web::test]
    async fn test_unknown_template_is_not_found() {
        let state = uploaded(ScriptedModel::new()).await;
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        let request = test::TestRequest::post().uri("/api/v1/generate/template/nope").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), 404);
    }

    #[actix_web::test]
    async fn test_total_failure_is_reported_in_session() {
        let state = uploaded(
            ScriptedModel::new()
                .then(Outcome::Fail("first".into()))
                .then(Outcome::Fail("second".into()))
                .then(Outcome::Fail("third".into())),
        )
        .await;
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        let request = test::TestRequest::post()
            .uri("/api/v1/generate/custom")
            .set_json(json!({"prompt": "make it gold"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["data"]["status"], "errored");
        assert_eq!(body["data"]["error"], "API error: 500 - first");
        assert_eq!(body["data"]["image"]["name"], "me.png");
    }

    #[actix_web::test]
    async fn test_style_image_and_regenerate_conflicts() {
        let state = uploaded(ScriptedModel::new()).await;
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        let response =
            test::call_service(&app, test::TestRequest::post().uri("/api/v1/generate/style-image").to_request()).await;
        assert_eq!(response.status(), 409);

        let response =
            test::call_service(&app, test::TestRequest::post().uri("/api/v1/generate/regenerate").to_request()).await;
        assert_eq!(response.status(), 409);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["error"]["code"], "NOTHING_TO_REGENERATE");
    }
}
