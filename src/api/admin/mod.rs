// Admin console - permission-gated pages and the JSON endpoints their forms call

pub mod activity;
pub mod faq;
pub mod fees;
pub mod financials;
pub mod rooms;

use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono_tz::Tz;

use crate::api::layout::{access_denied, Layout};
use crate::api::middleware::auth::{permissions_for, require_permission, CurrentUser};
use crate::api::middleware::session::AppState;
use crate::api::middleware::site::Site;
use crate::error::{AppError, Result};
use crate::models::Permissions;

pub const PERM_ROOM_ACTIVITY: &str = "RoomReadActivity";
pub const PERM_ROOM_FINANCIALS: &str = "RoomReadFinancials";
pub const PERM_ROOM_WEB_CONTENT: &str = "RoomManageWebContent";
pub const PERM_GLOBAL_ROOM_FEES: &str = "GlobalManageRoomFees";
pub const PERM_GLOBAL_ROOMS: &str = "GlobalManageRooms";
pub const PERM_GLOBAL_FINANCIALS: &str = "GlobalReadRoomFinancials";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin_menu))
        .merge(activity::router())
        .merge(faq::router())
        .merge(fees::router())
        .merge(financials::router())
        .merge(rooms::router())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub path: &'static str,
    pub permission: &'static str,
}

pub const CLUB_MENU: [MenuItem; 3] = [
    MenuItem {
        label: "Room Activity",
        path: "/admin/activity",
        permission: PERM_ROOM_ACTIVITY,
    },
    MenuItem {
        label: "Room Financials",
        path: "/admin/financials",
        permission: PERM_ROOM_FINANCIALS,
    },
    MenuItem {
        label: "FAQ",
        path: "/admin/faq",
        permission: PERM_ROOM_WEB_CONTENT,
    },
];

pub const PLATFORM_MENU: [MenuItem; 3] = [
    MenuItem {
        label: "Room Fees",
        path: "/admin/fees",
        permission: PERM_GLOBAL_ROOM_FEES,
    },
    MenuItem {
        label: "Rooms",
        path: "/admin/rooms",
        permission: PERM_GLOBAL_ROOMS,
    },
    MenuItem {
        label: "Room Financials",
        path: "/admin/financials",
        permission: PERM_GLOBAL_FINANCIALS,
    },
];

pub fn menu_for(site: &Site) -> &'static [MenuItem] {
    if site.is_platform() {
        &PLATFORM_MENU
    } else {
        &CLUB_MENU
    }
}

/// Menu entries the caller holds the permission for, in menu order.
pub fn visible_items(menu: &[MenuItem], permissions: &Permissions) -> Vec<MenuItem> {
    menu.iter()
        .filter(|item| permissions.has(item.permission))
        .copied()
        .collect()
}

/// Everything an admin page needs to decide what to show.
pub struct AdminScope {
    pub layout: Layout,
    pub room_slug: Option<String>,
    pub permissions: Permissions,
    pub menu: Vec<MenuItem>,
}

impl AdminScope {
    pub async fn load(
        state: &AppState,
        site: &Site,
        user: &CurrentUser,
        title: &str,
    ) -> Result<Self> {
        if site.is_auth() {
            return Err(AppError::NotFound("Page not found".to_string()));
        }

        let room_slug = site.room_slug(state).await;
        let permissions = permissions_for(state, user, room_slug.as_deref()).await?;
        let menu = visible_items(menu_for(site), &permissions);

        Ok(Self {
            layout: Layout::for_user(site, user, title),
            room_slug,
            permissions,
            menu,
        })
    }

    pub fn allows(&self, permission: &str) -> bool {
        self.permissions.has(permission)
    }

    pub fn denied(self) -> Response {
        access_denied(self.layout).into_response()
    }
}

/// Permission gate for the JSON endpoints behind the admin forms. Returns the
/// site's room slug, if any.
pub(crate) async fn authorize(
    state: &AppState,
    site: &Site,
    user: &CurrentUser,
    permission: &str,
) -> Result<Option<String>> {
    if site.is_auth() {
        return Err(AppError::NotFound("Page not found".to_string()));
    }
    let room_slug = site.room_slug(state).await;
    require_permission(state, user, room_slug.as_deref(), permission).await?;
    Ok(room_slug)
}

/// Wall clock of a room: its own timezone when the caller may read the room
/// record, the configured default otherwise.
pub(crate) async fn room_timezone(state: &AppState, user: &CurrentUser, slug: &str) -> Tz {
    match state.backend.room(&user.id_token, slug).await {
        Ok(room) => room.timezone().unwrap_or_else(|| {
            tracing::warn!(slug, tz = %room.tz, "Room has an unknown timezone");
            state.config.timezone
        }),
        Err(e) => {
            tracing::debug!(slug, error = %e, "Room timezone unavailable, using default");
            state.config.timezone
        }
    }
}

/// [`authorize`] for endpoints that only exist on the platform site. Club
/// sites are refused before any permission lookup.
pub(crate) async fn authorize_platform(
    state: &AppState,
    site: &Site,
    user: &CurrentUser,
    permission: &str,
) -> Result<()> {
    if !site.is_platform() {
        tracing::warn!(host = %site.host, permission, "Platform endpoint called from another site");
        return Err(AppError::Forbidden);
    }
    authorize(state, site, user, permission).await.map(|_| ())
}

#[derive(Template)]
#[template(path = "admin/menu.html")]
struct AdminMenuTemplate {
    layout: Layout,
    menu: Vec<MenuItem>,
}

async fn admin_menu(
    State(state): State<AppState>,
    site: Site,
    user: CurrentUser,
) -> Result<Response> {
    let scope = AdminScope::load(&state, &site, &user, "Admin").await?;

    if scope.menu.is_empty() {
        tracing::warn!(sub = %user.claims.sub, "Admin menu requested without permissions");
        return Ok(scope.denied());
    }

    Ok(AdminMenuTemplate {
        layout: scope.layout,
        menu: scope.menu,
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissions(global: &[&str], room: &[&str]) -> Permissions {
        Permissions {
            user_id: Some("7".to_string()),
            global_permissions: global.iter().map(|p| p.to_string()).collect(),
            room_permissions: room.iter().map(|p| p.to_string()).collect(),
            event_permissions: Vec::new(),
        }
    }

    #[test]
    fn test_club_menu_filtering() {
        let perms = permissions(&[], &[PERM_ROOM_FINANCIALS, PERM_ROOM_WEB_CONTENT]);
        let items = visible_items(&CLUB_MENU, &perms);

        let labels: Vec<_> = items.iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["Room Financials", "FAQ"]);
    }

    #[test]
    fn test_platform_menu_uses_global_permissions() {
        let perms = permissions(&[PERM_GLOBAL_ROOMS], &[PERM_ROOM_FINANCIALS]);
        let items = visible_items(&PLATFORM_MENU, &perms);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, "/admin/rooms");
    }

    #[test]
    fn test_no_permissions_no_menu() {
        assert!(visible_items(&CLUB_MENU, &Permissions::default()).is_empty());
        assert!(visible_items(&PLATFORM_MENU, &Permissions::default()).is_empty());
    }
}
