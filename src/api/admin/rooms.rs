use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::{authorize_platform, AdminScope, MenuItem, PERM_GLOBAL_ROOMS};
use crate::api::layout::{inline_error, Layout};
use crate::api::middleware::auth::CurrentUser;
use crate::api::middleware::session::AppState;
use crate::api::middleware::site::Site;
use crate::error::{AppError, Result};
use crate::models::room::{RoomInput, RoomIpInput, DEFAULT_CURRENCY, DEFAULT_TIMEZONE};
use crate::models::{Room, RoomIp, RoomSummary, Table, TableInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/rooms", get(rooms_page))
        .route("/api/admin/rooms", post(create_room))
        .route("/api/admin/rooms/:slug", put(update_room))
        .route("/api/admin/rooms/:slug/ips", post(add_ip))
        .route("/api/admin/rooms/:slug/ips/:id", put(update_ip).delete(delete_ip))
        .route("/api/admin/rooms/:slug/tables", post(create_table))
        .route(
            "/api/admin/rooms/:slug/tables/:id",
            put(update_table).delete(delete_table),
        )
}

#[derive(Template)]
#[template(path = "admin/rooms.html")]
struct RoomsTemplate {
    layout: Layout,
    menu: Vec<MenuItem>,
    rooms: Vec<RoomSummary>,
    selected: Option<String>,
    room: Option<Room>,
    tables: Vec<Table>,
    default_tz: &'static str,
    default_currency: &'static str,
    error: Option<String>,
}

impl RoomsTemplate {
    fn is_selected(&self, slug: &str) -> bool {
        self.selected.as_deref() == Some(slug)
    }
}

#[derive(Debug, Deserialize)]
struct RoomQuery {
    room: Option<String>,
}

/// Platform room configuration: room list, then the selected room's settings,
/// allowed IPs and tables.
async fn rooms_page(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Query(params): Query<RoomQuery>,
) -> Result<Response> {
    let scope = AdminScope::load(&state, &site, &user, "Rooms").await?;
    if !site.is_platform() || !scope.allows(PERM_GLOBAL_ROOMS) {
        return Ok(scope.denied());
    }

    let mut page = RoomsTemplate {
        layout: scope.layout,
        menu: scope.menu,
        rooms: Vec::new(),
        selected: params.room.filter(|r| !r.is_empty()),
        room: None,
        tables: Vec::new(),
        default_tz: DEFAULT_TIMEZONE,
        default_currency: DEFAULT_CURRENCY,
        error: None,
    };

    match state.backend.list_rooms(&user.id_token).await {
        Ok(rooms) => page.rooms = rooms,
        Err(e) => page.error = Some(inline_error(e, "rooms")?),
    }

    if let Some(slug) = page.selected.as_deref() {
        match tokio::try_join!(
            state.backend.room(&user.id_token, slug),
            state.backend.tables(&user.id_token, slug),
        ) {
            Ok((room, tables)) => {
                page.room = Some(room);
                page.tables = tables;
            }
            Err(e) => page.error = Some(inline_error(e, "room")?),
        }
    }

    Ok(page.into_response())
}

async fn create_room(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Json(input): Json<RoomInput>,
) -> Result<(StatusCode, Json<Room>)> {
    authorize_platform(&state, &site, &user, PERM_GLOBAL_ROOMS).await?;
    let input = input.validated().map_err(AppError::Validation)?;

    let room = state.backend.create_room(&user.id_token, &input).await?;

    tracing::info!(room_slug = %room.slug, "Created room");

    Ok((StatusCode::CREATED, Json(room)))
}

async fn update_room(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Path(slug): Path<String>,
    Json(input): Json<RoomInput>,
) -> Result<Json<Room>> {
    authorize_platform(&state, &site, &user, PERM_GLOBAL_ROOMS).await?;
    let input = input.validated().map_err(AppError::Validation)?;

    let room = state.backend.update_room(&user.id_token, &slug, &input).await?;

    tracing::info!(room_slug = %slug, "Updated room");

    Ok(Json(room))
}

async fn add_ip(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Path(slug): Path<String>,
    Json(input): Json<RoomIpInput>,
) -> Result<(StatusCode, Json<RoomIp>)> {
    authorize_platform(&state, &site, &user, PERM_GLOBAL_ROOMS).await?;
    let input = input.validated().map_err(AppError::Validation)?;

    let ip = state.backend.add_ip(&user.id_token, &slug, &input).await?;

    tracing::info!(room_slug = %slug, ip = %ip.ip, "Added room IP");

    Ok((StatusCode::CREATED, Json(ip)))
}

async fn update_ip(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Path((slug, id)): Path<(String, i64)>,
    Json(input): Json<RoomIpInput>,
) -> Result<StatusCode> {
    authorize_platform(&state, &site, &user, PERM_GLOBAL_ROOMS).await?;
    let input = input.validated().map_err(AppError::Validation)?;

    state
        .backend
        .update_ip(&user.id_token, &slug, id, &input)
        .await?;

    tracing::info!(room_slug = %slug, ip_id = id, "Updated room IP");

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_ip(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Path((slug, id)): Path<(String, i64)>,
) -> Result<StatusCode> {
    authorize_platform(&state, &site, &user, PERM_GLOBAL_ROOMS).await?;

    state.backend.delete_ip(&user.id_token, &slug, id).await?;

    tracing::info!(room_slug = %slug, ip_id = id, "Deleted room IP");

    Ok(StatusCode::NO_CONTENT)
}

async fn create_table(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Path(slug): Path<String>,
    Json(input): Json<TableInput>,
) -> Result<StatusCode> {
    authorize_platform(&state, &site, &user, PERM_GLOBAL_ROOMS).await?;
    let input = input.validated().map_err(AppError::Validation)?;

    state
        .backend
        .create_table(&user.id_token, &slug, &input)
        .await?;

    tracing::info!(room_slug = %slug, table = %input.name, "Created table");

    Ok(StatusCode::CREATED)
}

async fn update_table(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Path((slug, id)): Path<(String, i64)>,
    Json(input): Json<TableInput>,
) -> Result<StatusCode> {
    authorize_platform(&state, &site, &user, PERM_GLOBAL_ROOMS).await?;
    let input = input.validated().map_err(AppError::Validation)?;

    state
        .backend
        .update_table(&user.id_token, &slug, id, &input)
        .await?;

    tracing::info!(room_slug = %slug, table_id = id, "Updated table");

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_table(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Path((slug, id)): Path<(String, i64)>,
) -> Result<StatusCode> {
    authorize_platform(&state, &site, &user, PERM_GLOBAL_ROOMS).await?;

    state.backend.delete_table(&user.id_token, &slug, id).await?;

    tracing::info!(room_slug = %slug, table_id = id, "Deleted table");

    Ok(StatusCode::NO_CONTENT)
}
