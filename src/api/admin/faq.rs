use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};

use super::{authorize, AdminScope, MenuItem, PERM_ROOM_WEB_CONTENT};
use crate::api::layout::{inline_error, Layout, MessageTemplate};
use crate::api::middleware::auth::CurrentUser;
use crate::api::middleware::session::AppState;
use crate::api::middleware::site::Site;
use crate::error::{AppError, Result};
use crate::models::WebFaq;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/faq", get(faq_editor))
        .route("/api/admin/faq", put(save_faq))
}

#[derive(Template)]
#[template(path = "admin/faq.html")]
struct FaqEditorTemplate {
    layout: Layout,
    menu: Vec<MenuItem>,
    faq: WebFaq,
    faq_json: String,
    error: Option<String>,
}

/// Club FAQ editor. The document is edited as JSON and previewed below.
async fn faq_editor(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
) -> Result<Response> {
    let scope = AdminScope::load(&state, &site, &user, "FAQ").await?;
    if !scope.allows(PERM_ROOM_WEB_CONTENT) {
        return Ok(scope.denied());
    }

    let Some(host) = site.club_host().filter(|_| scope.room_slug.is_some()) else {
        return Ok(MessageTemplate::new(
            scope.layout,
            "FAQ",
            "No club is registered for this site.",
        )
        .into_response());
    };

    let (faq, error) = match state.backend.faq(host).await {
        Ok(faq) => (faq, None),
        Err(e) => (WebFaq::default(), Some(inline_error(e, "FAQ")?)),
    };

    let faq_json =
        serde_json::to_string_pretty(&faq).map_err(|e| AppError::Internal(e.into()))?;

    Ok(FaqEditorTemplate {
        layout: scope.layout,
        menu: scope.menu,
        faq,
        faq_json,
        error,
    }
    .into_response())
}

/// Saves the FAQ of the club this site belongs to.
async fn save_faq(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Json(faq): Json<WebFaq>,
) -> Result<StatusCode> {
    let room_slug = authorize(&state, &site, &user, PERM_ROOM_WEB_CONTENT)
        .await?
        .ok_or_else(|| AppError::NotFound("No club is registered for this site".to_string()))?;

    let faq = faq.validated().map_err(AppError::Validation)?;

    state
        .backend
        .save_faq(&user.id_token, &room_slug, &faq)
        .await?;

    tracing::info!(
        room_slug = %room_slug,
        categories = faq.categories.len(),
        "Saved FAQ"
    );

    Ok(StatusCode::NO_CONTENT)
}
