//! API module - HTTP routes and handlers

pub mod handlers;
pub mod openapi;

use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::openapi::ApiDoc;

/// Configure all API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::scope("/session")
                    .route("", web::get().to(handlers::session::get_session))
                    .route("", web::delete().to(handlers::session::reset_session))
                    .route("/image", web::post().to(handlers::session::upload_image))
                    .route("/options", web::put().to(handlers::session::update_options))
                    .route("/style-image", web::put().to(handlers::session::set_style_image))
                    .route("/style-image", web::delete().to(handlers::session::clear_style_image))
                    .route("/variants/{index}", web::post().to(handlers::session::select_variant))
                    .route("/history/{index}", web::post().to(handlers::session::select_history))
                    .route("/download", web::get().to(handlers::session::download))
            )
            .service(
                web::scope("/generate")
                    .route("/template/{template_id}", web::post().to(handlers::generate::generate_with_template))
                    .route("/custom", web::post().to(handlers::generate::generate_custom))
                    .route("/style-image", web::post().to(handlers::generate::generate_with_style_image))
                    .route("/regenerate", web::post().to(handlers::generate::regenerate))
            )
            .service(
                web::scope("/templates")
                    // More specific routes first
                    .route("/idea", web::post().to(handlers::templates::generate_idea))
                    .route("/thumbnail", web::post().to(handlers::templates::generate_thumbnail))
                    // General routes
                    .route("", web::get().to(handlers::templates::list_templates))
                    .route("", web::post().to(handlers::templates::create_template))
                    .route("/{template_id}", web::put().to(handlers::templates::update_template))
                    .route("/{template_id}", web::delete().to(handlers::templates::delete_template))
            )
            .route("/style/analyze", web::post().to(handlers::style::analyze_style))
    )
    .route("/health", web::get().to(handlers::health::health_check))
    // Swagger UI and OpenAPI spec
    .service(
        SwaggerUi::new("/swagger-ui/{_:.*}")
            .url("/api-docs/openapi.json", ApiDoc::openapi())
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_support;
    use crate::providers::scripted::ScriptedModel;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_routes_and_openapi_document() {
        let app = test::init_service(
            App::new()
                .app_data(test_support::state(ScriptedModel::new()))
                .configure(configure_routes),
        )
        .await;

        let body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/v1/session").to_request()).await;
        assert_eq!(body["data"]["status"], "empty");

        let doc: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api-docs/openapi.json").to_request(),
        )
        .await;
        assert!(doc["paths"]["/api/v1/generate/custom"]["post"].is_object());
        assert!(doc["paths"]["/api/v1/templates/{template_id}"]["delete"].is_object());
    }
}
