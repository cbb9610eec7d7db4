use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;

use super::{
    authorize, room_timezone, AdminScope, MenuItem, PERM_GLOBAL_FINANCIALS, PERM_ROOM_FINANCIALS,
};
use crate::api::layout::{inline_error, Layout, MessageTemplate};
use crate::api::middleware::auth::CurrentUser;
use crate::api::middleware::session::AppState;
use crate::api::middleware::site::Site;
use crate::error::{AppError, Result};
use crate::format;
use crate::models::financials::{
    recent_months, DateRange, LedgerPage, MonthOption, RefundRequest, LEDGER_PAGE_SIZE,
};
use crate::models::{MonthlyRow, RoomFinancialSummary, RoomSummary};
use crate::services::backend::Ledger;

/// Entries in the month picker.
const MONTH_PICKER_MONTHS: u32 = 12;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/financials", get(financials_page))
        .route("/api/admin/financials/:slug/refund", post(refund))
}

fn permission_for(site: &Site) -> &'static str {
    if site.is_platform() {
        PERM_GLOBAL_FINANCIALS
    } else {
        PERM_ROOM_FINANCIALS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinancialTab {
    Summary,
    Monthly,
    Ledger(Ledger),
}

impl FinancialTab {
    pub const ALL: [FinancialTab; 5] = [
        FinancialTab::Summary,
        FinancialTab::Monthly,
        FinancialTab::Ledger(Ledger::SpendRefund),
        FinancialTab::Ledger(Ledger::DepositsWithdrawals),
        FinancialTab::Ledger(Ledger::BonusGrantRevoke),
    ];

    /// Unknown keys fall back to the summary.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("monthly") => FinancialTab::Monthly,
            Some(other) => Ledger::from_path(other)
                .map(FinancialTab::Ledger)
                .unwrap_or(FinancialTab::Summary),
            None => FinancialTab::Summary,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            FinancialTab::Summary => "summary",
            FinancialTab::Monthly => "monthly",
            FinancialTab::Ledger(ledger) => ledger.path(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FinancialTab::Summary => "Summary",
            FinancialTab::Monthly => "Monthly",
            FinancialTab::Ledger(ledger) => ledger.title(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FinancialsQuery {
    pub room: Option<String>,
    pub tab: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub month: Option<String>,
    #[serde(default)]
    pub offset: usize,
}

impl FinancialsQuery {
    /// A picked month wins over explicit dates.
    pub fn range(&self, months: &[MonthOption], today: NaiveDate) -> DateRange {
        self.month
            .as_deref()
            .and_then(|key| months.iter().find(|m| m.value == key))
            .map(|m| m.range)
            .unwrap_or_else(|| DateRange::from_query(self.start.as_deref(), self.end.as_deref(), today))
    }
}

/// Link back to this page with some parameters changed.
fn page_href(room: Option<&str>, tab: FinancialTab, range: &DateRange, offset: usize) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(room) = room {
        query.append_pair("room", room);
    }
    query
        .append_pair("tab", tab.key())
        .append_pair("start", &range.start_str())
        .append_pair("end", &range.end_str());
    if offset > 0 {
        query.append_pair("offset", &offset.to_string());
    }
    format!("/admin/financials?{}", query.finish())
}

pub struct TabLink {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

pub struct MonthlyLine {
    pub row: MonthlyRow,
    pub href: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/financials.html")]
struct FinancialsTemplate {
    layout: Layout,
    menu: Vec<MenuItem>,
    platform: bool,
    rooms: Vec<RoomSummary>,
    slug: Option<String>,
    tabs: Vec<TabLink>,
    tab_key: &'static str,
    tab_label: &'static str,
    range: DateRange,
    months: Vec<MonthOption>,
    summary: Option<RoomFinancialSummary>,
    monthly: Vec<MonthlyLine>,
    ledger: LedgerPage,
    tz: Tz,
    next_href: Option<String>,
    prev_href: Option<String>,
    error: Option<String>,
}

impl FinancialsTemplate {
    fn money(&self, cents: i64) -> String {
        format::currency(cents)
    }

    fn is_selected(&self, slug: &str) -> bool {
        self.slug.as_deref() == Some(slug)
    }
}

/// Room financials: period summary, monthly history and the transaction
/// ledgers. Clubs see their own room; the platform picks one.
async fn financials_page(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Query(params): Query<FinancialsQuery>,
) -> Result<Response> {
    let scope = AdminScope::load(&state, &site, &user, "Room Financials").await?;
    if !scope.allows(permission_for(&site)) {
        return Ok(scope.denied());
    }

    let platform = site.is_platform();
    let slug = if platform {
        params.room.clone().filter(|r| !r.is_empty())
    } else {
        match scope.room_slug.clone() {
            Some(slug) => Some(slug),
            None => {
                return Ok(MessageTemplate::new(
                    scope.layout,
                    "Room Financials",
                    "No club is registered for this site.",
                )
                .into_response())
            }
        }
    };

    let tz = match slug.as_deref() {
        Some(slug) => room_timezone(&state, &user, slug).await,
        None => state.config.timezone,
    };
    let today = format::today(tz);
    let months = recent_months(today, MONTH_PICKER_MONTHS);
    let range = params.range(&months, today);
    let tab = FinancialTab::parse(params.tab.as_deref());
    let room_param = if platform { slug.clone() } else { None };
    let room_param = room_param.as_deref();

    let mut page = FinancialsTemplate {
        layout: scope.layout,
        menu: scope.menu,
        platform,
        rooms: Vec::new(),
        slug: slug.clone(),
        tabs: FinancialTab::ALL
            .iter()
            .map(|t| TabLink {
                label: t.label(),
                href: page_href(room_param, *t, &range, 0),
                active: *t == tab,
            })
            .collect(),
        tab_key: tab.key(),
        tab_label: tab.label(),
        range,
        months,
        summary: None,
        monthly: Vec::new(),
        ledger: LedgerPage::empty(LEDGER_PAGE_SIZE),
        tz,
        next_href: None,
        prev_href: None,
        error: None,
    };

    if platform {
        match state.backend.list_rooms(&user.id_token).await {
            Ok(rooms) => page.rooms = rooms,
            Err(e) => page.error = Some(inline_error(e, "rooms")?),
        }
    }

    let Some(slug) = slug else {
        return Ok(page.into_response());
    };

    match tab {
        FinancialTab::Summary => {
            match state.backend.room_summary(&user.id_token, &slug, &range).await {
                Ok(summary) => page.summary = Some(summary),
                Err(e) => page.error = Some(inline_error(e, "room summary")?),
            }
        }
        FinancialTab::Monthly => match state.backend.monthly_summary(&user.id_token, &slug).await {
            Ok(rows) => {
                page.monthly = rows
                    .into_iter()
                    .map(|row| MonthlyLine {
                        href: row
                            .range()
                            .map(|r| page_href(room_param, FinancialTab::Summary, &r, 0)),
                        row,
                    })
                    .collect();
            }
            Err(e) => page.error = Some(inline_error(e, "monthly summary")?),
        },
        FinancialTab::Ledger(ledger) => {
            match state
                .backend
                .ledger(&user.id_token, &slug, ledger, &range, params.offset)
                .await
            {
                Ok(rows) => {
                    page.next_href = rows
                        .next_offset
                        .map(|next| page_href(room_param, tab, &range, next));
                    page.prev_href = rows
                        .previous_offset()
                        .map(|prev| page_href(room_param, tab, &range, prev));
                    page.ledger = rows;
                }
                Err(e) => page.error = Some(inline_error(e, ledger.title())?),
            }
        }
    }

    Ok(page.into_response())
}

/// Reverses a spend transaction.
async fn refund(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
    Path(slug): Path<String>,
    Json(request): Json<RefundRequest>,
) -> Result<StatusCode> {
    let room_slug = authorize(&state, &site, &user, permission_for(&site)).await?;

    // Club admins may only touch their own room
    if !site.is_platform() && room_slug.as_deref() != Some(slug.as_str()) {
        return Err(AppError::Forbidden);
    }

    state
        .backend
        .refund(&user.id_token, &slug, request.original_tx_id)
        .await?;

    tracing::info!(
        room_slug = %slug,
        original_tx_id = request.original_tx_id,
        "Refund issued"
    );

    Ok(StatusCode::NO_CONTENT)
}
