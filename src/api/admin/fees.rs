use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use super::{authorize_platform, AdminScope, MenuItem, PERM_GLOBAL_ROOM_FEES};
use crate::api::layout::{inline_error, Layout};
use crate::api::middleware::auth::CurrentUser;
use crate::api::middleware::session::AppState;
use crate::api::middleware::site::Site;
use crate::error::{AppError, Result};
use crate::models::fees::{
    prepare_schedule, sort_schedule, FeeRevenueType, PricingModel, RoomFeeScheduleInput,
};
use crate::models::RoomSummary;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/fees", get(fees_page))
        .route("/api/admin/fees/:slug", put(save_fees))
}

#[derive(Template)]
#[template(path = "admin/fees.html")]
struct FeesTemplate {
    layout: Layout,
    menu: Vec<MenuItem>,
    rooms: Vec<RoomSummary>,
    selected: Option<String>,
    fees: Vec<RoomFeeScheduleInput>,
    blank: RoomFeeScheduleInput,
    revenue_types: [FeeRevenueType; 2],
    pricing_models: [PricingModel; 2],
    error: Option<String>,
}

impl FeesTemplate {
    fn is_selected(&self, slug: &str) -> bool {
        self.selected.as_deref() == Some(slug)
    }
}

#[derive(Debug, Deserialize)]
struct FeesQuery {
    room: Option<String>,
}

/// Platform fee schedule editor for one room at a time.
async fn fees_page(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Query(params): Query<FeesQuery>,
) -> Result<Response> {
    let scope = AdminScope::load(&state, &site, &user, "Room Fees").await?;
    if !site.is_platform() || !scope.allows(PERM_GLOBAL_ROOM_FEES) {
        return Ok(scope.denied());
    }

    let mut page = FeesTemplate {
        layout: scope.layout,
        menu: scope.menu,
        rooms: Vec::new(),
        selected: params.room.filter(|r| !r.is_empty()),
        fees: Vec::new(),
        blank: RoomFeeScheduleInput::blank(),
        revenue_types: FeeRevenueType::ALL,
        pricing_models: PricingModel::ALL,
        error: None,
    };

    match state.backend.list_rooms(&user.id_token).await {
        Ok(rooms) => page.rooms = rooms,
        Err(e) => page.error = Some(inline_error(e, "rooms")?),
    }

    if let Some(slug) = page.selected.as_deref() {
        match state.backend.room_fees(&user.id_token, slug).await {
            Ok(fees) => {
                let mut fees: Vec<_> = fees.iter().map(RoomFeeScheduleInput::from).collect();
                sort_schedule(&mut fees);
                page.fees = fees;
            }
            Err(e) => page.error = Some(inline_error(e, "fee schedule")?),
        }
    }

    Ok(page.into_response())
}

/// Replaces a room's whole fee schedule.
async fn save_fees(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Path(slug): Path<String>,
    Json(fees): Json<Vec<RoomFeeScheduleInput>>,
) -> Result<StatusCode> {
    authorize_platform(&state, &site, &user, PERM_GLOBAL_ROOM_FEES).await?;

    let mut fees = prepare_schedule(fees).map_err(AppError::Validation)?;
    sort_schedule(&mut fees);

    state
        .backend
        .save_room_fees(&user.id_token, &slug, &fees)
        .await?;

    tracing::info!(room_slug = %slug, bands = fees.len(), "Saved fee schedule");

    Ok(StatusCode::NO_CONTENT)
}
