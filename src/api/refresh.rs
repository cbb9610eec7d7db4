use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::api::middleware::auth::{refresh_session, AuthContext};
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/refresh", post(refresh))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub expires_at: String,
}

/// Refreshes the session's tokens on demand.
async fn refresh(State(state): State<AppState>, auth: AuthContext) -> Result<Json<RefreshResponse>> {
    let tokens = auth.tokens.as_ref().ok_or(AppError::Unauthorized)?;
    let refresh_token = tokens
        .refresh_token
        .as_deref()
        .ok_or_else(|| AppError::Validation("No refresh token in session".to_string()))?;

    let fresh = refresh_session(&state, &auth.session, refresh_token).await?;

    Ok(Json(RefreshResponse {
        expires_at: fresh.expires_at.to_rfc3339(),
    }))
}
