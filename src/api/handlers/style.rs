//! Style reference analysis endpoint

use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::AppState;
use crate::api::handlers::{error_response, ErrorResponse};

/// Prompt derived from the style reference image
#[derive(Serialize, ToSchema)]
pub struct StylePromptResponse {
    pub success: bool,
    pub prompt: String,
}

/// POST /api/v1/style/analyze - Describe the style image as a prompt
#[utoipa::path(
    post,
    path = "/api/v1/style/analyze",
    tag = "style",
    responses(
        (status = 200, description = "Prompt describing the style image", body = StylePromptResponse),
        (status = 409, description = "No image or no style image", body = ErrorResponse),
        (status = 502, description = "Model call failed", body = ErrorResponse)
    )
)]
pub async fn analyze_style(state: web::Data<AppState>) -> HttpResponse {
    match state.editor.analyze_style_image().await {
        Ok(prompt) => {
            info!(prompt_chars = prompt.len(), "Generated prompt from style image");
            HttpResponse::Ok().json(StylePromptResponse { success: true, prompt })
        }
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_support;
    use crate::providers::scripted::ScriptedModel;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_analyze_without_image_conflicts() {
        let app = test::init_service(
            App::new()
                .app_data(test_support::state(ScriptedModel::new()))
                .route("/api/v1/style/analyze", web::post().to(analyze_style)),
        )
        .await;

        let response =
            test::call_service(&app, test::TestRequest::post().uri("/api/v1/style/analyze").to_request()).await;
        assert_eq!(response.status(), 409);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["error"]["code"], "NO_IMAGE");
    }
}
