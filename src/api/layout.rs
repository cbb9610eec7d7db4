use askama::Template;
use axum::http::StatusCode;

use crate::api::middleware::auth::{AuthContext, CurrentUser};
use crate::api::middleware::site::Site;
use crate::error::{AppError, Result};
use crate::services::backend::ApiError;

/// Header and navigation data shared by every page.
#[derive(Debug, Clone)]
pub struct Layout {
    pub title: String,
    pub user_label: Option<String>,
    pub platform: bool,
}

impl Layout {
    pub fn new(site: &Site, auth: &AuthContext, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            user_label: auth.display_label().map(str::to_string),
            platform: site.is_platform(),
        }
    }

    pub fn for_user(site: &Site, user: &CurrentUser, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            user_label: Some(user.claims.display_label().to_string()),
            platform: site.is_platform(),
        }
    }

    /// Layout for pages that never show a signed-in user.
    pub fn bare(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            user_label: None,
            platform: false,
        }
    }
}

/// A page carrying a single message.
#[derive(Template)]
#[template(path = "message.html")]
pub struct MessageTemplate {
    pub layout: Layout,
    pub heading: String,
    pub message: String,
}

impl MessageTemplate {
    pub fn new(layout: Layout, heading: &str, message: &str) -> Self {
        Self {
            layout,
            heading: heading.to_string(),
            message: message.to_string(),
        }
    }
}

pub fn access_denied(layout: Layout) -> (StatusCode, MessageTemplate) {
    (
        StatusCode::FORBIDDEN,
        MessageTemplate::new(
            layout,
            "Access Denied",
            "You do not have permission to view this page.",
        ),
    )
}

/// Renders a backend failure as inline page text. An expired session still
/// goes back through login.
pub fn inline_error(err: ApiError, what: &str) -> Result<String> {
    match err {
        ApiError::Unauthorized => Err(AppError::Backend(ApiError::Unauthorized)),
        other => {
            tracing::error!(error = %other, "Failed to load {}", what);
            Ok(format!("Failed to load {}.", what))
        }
    }
}
