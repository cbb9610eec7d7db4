use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono_tz::Tz;
use serde::Deserialize;

use super::{room_timezone, AdminScope, MenuItem, PERM_ROOM_ACTIVITY};
use crate::api::layout::{inline_error, Layout, MessageTemplate};
use crate::api::middleware::auth::CurrentUser;
use crate::api::middleware::session::AppState;
use crate::api::middleware::site::Site;
use crate::error::Result;
use crate::models::activity::{ActivityPage, ACTIVITY_PAGE_SIZE};

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/activity", get(activity_page))
}

#[derive(Template)]
#[template(path = "admin/activity.html")]
struct ActivityTemplate {
    layout: Layout,
    menu: Vec<MenuItem>,
    page: Option<ActivityPage>,
    tz: Tz,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    #[serde(default)]
    offset: usize,
}

/// Door log of the club's room, newest first.
async fn activity_page(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Query(params): Query<ActivityQuery>,
) -> Result<Response> {
    let scope = AdminScope::load(&state, &site, &user, "Room Activity").await?;
    if !scope.allows(PERM_ROOM_ACTIVITY) {
        return Ok(scope.denied());
    }

    let Some(slug) = scope.room_slug.as_deref() else {
        return Ok(MessageTemplate::new(
            scope.layout,
            "Room Activity",
            "No club is registered for this site.",
        )
        .into_response());
    };

    let tz = room_timezone(&state, &user, slug).await;
    let (page, error) = match state
        .backend
        .door_events(&user.id_token, slug, ACTIVITY_PAGE_SIZE, params.offset)
        .await
    {
        Ok(events) => (
            Some(ActivityPage::new(events, params.offset, ACTIVITY_PAGE_SIZE)),
            None,
        ),
        Err(e) => (None, Some(inline_error(e, "room activity")?)),
    };

    Ok(ActivityTemplate {
        layout: scope.layout,
        menu: scope.menu,
        page,
        tz,
        error,
    }
    .into_response())
}
