use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::HOST, request::Parts},
};

use super::session::AppState;
use crate::error::AppError;
use crate::services::tenancy::{self, SiteKind};

const FORWARDED_HOST: &str = "x-forwarded-host";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Which site a request was addressed to.
#[derive(Debug, Clone)]
pub struct Site {
    pub kind: SiteKind,
    /// Normalized host (no port, lowercase).
    pub host: String,
    /// `scheme://host[:port]` as the browser sees it.
    pub origin: String,
}

impl Site {
    pub fn is_auth(&self) -> bool {
        self.kind == SiteKind::Auth
    }

    pub fn is_platform(&self) -> bool {
        self.kind == SiteKind::Platform
    }

    pub fn club_host(&self) -> Option<&str> {
        match &self.kind {
            SiteKind::Club(host) => Some(host),
            _ => None,
        }
    }

    /// Room slug of a club site; `None` for the platform and auth hosts and
    /// for hosts the backend does not know.
    pub async fn room_slug(&self, state: &AppState) -> Option<String> {
        match self.club_host() {
            Some(host) => state.tenants.resolve(host).await,
            None => None,
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for Site {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let raw_host = header(parts, FORWARDED_HOST)
            .or_else(|| header(parts, HOST.as_str()))
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .ok_or_else(|| AppError::Validation("Missing Host header".to_string()))?
            .to_string();

        let scheme = header(parts, FORWARDED_PROTO)
            .map(str::to_string)
            .unwrap_or_else(|| {
                if state.config.base_url.starts_with("https://") {
                    "https".to_string()
                } else {
                    "http".to_string()
                }
            });

        Ok(Site {
            kind: tenancy::classify(&state.config, &raw_host),
            host: tenancy::normalize_host(&raw_host),
            origin: format!("{}://{}", scheme, raw_host.to_lowercase()),
        })
    }
}
