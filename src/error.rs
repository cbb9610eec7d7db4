use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::backend::ApiError;

/// Marker placed on responses whose session tokens were rejected upstream.
/// `api::middleware::auth::expire_rejected_session` clears the tokens.
#[derive(Debug, Clone, Copy)]
pub struct SessionRejected;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Backend error: {0}")]
    Backend(#[from] ApiError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access Denied")]
    Forbidden,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_debug = format!("{:?}", self);

        let (status, error_message) = match self {
            AppError::Unauthorized | AppError::Backend(ApiError::Unauthorized) => {
                tracing::info!("Session rejected, redirecting to login");
                let mut response = Redirect::to("/login").into_response();
                response.extensions_mut().insert(SessionRejected);
                return response;
            }
            AppError::OAuth(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Backend(ApiError::Status { status: 404, body }) => {
                (StatusCode::NOT_FOUND, body)
            }
            AppError::Backend(ApiError::InvalidSegment(_)) => {
                (StatusCode::BAD_REQUEST, "Invalid identifier".to_string())
            }
            AppError::Backend(e) => {
                tracing::error!(error = %e, "Backend request failed");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            AppError::Session(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session error".to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Access Denied".to_string()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_debug,
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn test_unauthorized_redirects_to_login() {
        let response = AppError::Backend(ApiError::Unauthorized).into_response();

        assert!(response.status().is_redirection());
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
        assert!(response.extensions().get::<SessionRejected>().is_some());
    }

    #[test]
    fn test_backend_status_maps_to_bad_gateway() {
        let response = AppError::Backend(ApiError::Status {
            status: 500,
            body: "boom".to_string(),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_backend_not_found_passes_through() {
        let response = AppError::Backend(ApiError::Status {
            status: 404,
            body: "Room not found".to_string(),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_segment_is_bad_request() {
        let response = AppError::Backend(ApiError::InvalidSegment("..".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_forbidden() {
        let response = AppError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
