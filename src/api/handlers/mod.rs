//! HTTP request handlers

pub mod health;
pub mod session;
pub mod generate;
pub mod templates;
pub mod style;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::domain::TemplateError;
use crate::engine::GenerationError;
use crate::providers::ProviderError;
use crate::session::{SessionError, SessionSnapshot};

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ApiError,
}

#[derive(Serialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Session state wrapped in the standard envelope
#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    pub data: SessionSnapshot,
}

pub(crate) fn session_ok(snapshot: SessionSnapshot) -> HttpResponse {
    HttpResponse::Ok().json(SessionResponse {
        success: true,
        data: snapshot,
    })
}

pub(crate) fn error_body(status: StatusCode, code: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        success: false,
        error: ApiError {
            code: code.to_string(),
            message: message.into(),
        },
    })
}

/// Map a session error to a status code and error code
pub(crate) fn error_response(e: SessionError) -> HttpResponse {
    let (status, code) = match &e {
        SessionError::NoImage => (StatusCode::CONFLICT, "NO_IMAGE"),
        SessionError::Busy => (StatusCode::CONFLICT, "BUSY"),
        SessionError::NoStyleImage => (StatusCode::CONFLICT, "NO_STYLE_IMAGE"),
        SessionError::NothingToRegenerate => (StatusCode::CONFLICT, "NOTHING_TO_REGENERATE"),
        SessionError::NothingToDownload => (StatusCode::NOT_FOUND, "NOTHING_TO_DOWNLOAD"),
        SessionError::VariantOutOfRange(_) => (StatusCode::NOT_FOUND, "VARIANT_NOT_FOUND"),
        SessionError::HistoryOutOfRange(_) => (StatusCode::NOT_FOUND, "HISTORY_ENTRY_NOT_FOUND"),
        SessionError::EmptyPrompt => (StatusCode::BAD_REQUEST, "EMPTY_PROMPT"),
        SessionError::Image(_) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE"),
        SessionError::Template(TemplateError::NotFound(_)) => (StatusCode::NOT_FOUND, "TEMPLATE_NOT_FOUND"),
        SessionError::Template(TemplateError::DuplicateId(_)) => (StatusCode::CONFLICT, "TEMPLATE_EXISTS"),
        SessionError::Template(_) => (StatusCode::BAD_REQUEST, "INVALID_TEMPLATE"),
        SessionError::Generation(GenerationError::NotConfigured(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_NOT_CONFIGURED")
        }
        SessionError::Generation(GenerationError::Provider(ProviderError::RateLimited { .. })) => {
            (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED")
        }
        SessionError::Generation(_) => (StatusCode::BAD_GATEWAY, "GENERATION_FAILED"),
        SessionError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    if status.is_server_error() {
        error!(code = code, error = %e, "Request failed");
    } else {
        warn!(code = code, error = %e, "Request rejected");
    }

    error_body(status, code, e.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_error_response_shape() {
        let response = error_response(SessionError::Busy);
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "BUSY");
        assert_eq!(json["error"]["message"], "Another generation is in progress");
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (SessionError::NoImage, StatusCode::CONFLICT),
            (SessionError::Template(TemplateError::NotFound("x".into())), StatusCode::NOT_FOUND),
            (SessionError::Template(TemplateError::EmptyField), StatusCode::BAD_REQUEST),
            (
                SessionError::Generation(GenerationError::NotConfigured("no key".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SessionError::Generation(GenerationError::Provider(ProviderError::RateLimited { retry_after_secs: 1 })),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (SessionError::Generation(GenerationError::EmptyText), StatusCode::BAD_GATEWAY),
        ];
        for (error, status) in cases {
            assert_eq!(error_response(error).status(), status);
        }
    }
}
