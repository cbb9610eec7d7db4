use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use secrecy::ExposeSecret;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::services::backend::{ApiError, BackendClient};
use crate::services::encryption::SealKey;
use crate::services::tenancy::TenantCache;

/// Session keys used in the application
pub const SESSION_KEY_ID_TOKEN: &str = "id_token";
pub const SESSION_KEY_ACCESS_TOKEN: &str = "access_token";
pub const SESSION_KEY_PKCE_VERIFIER: &str = "pkce_verifier";
pub const SESSION_KEY_REFRESH_TOKEN: &str = "refresh_token";
pub const SESSION_KEY_TOKEN_EXPIRES_AT: &str = "token_expires_at";
pub const SESSION_KEY_OAUTH_STATE: &str = "oauth_state";
pub const SESSION_KEY_RETURN_URL: &str = "return_url";
pub const SESSION_KEY_PERMISSIONS: &str = "permissions";
/// Club side: nonce of the login in progress.
pub const SESSION_KEY_LOGIN_NONCE: &str = "login_nonce";
/// Auth host side: club nonce to seal into the handoff.
pub const SESSION_KEY_HANDOFF_NONCE: &str = "handoff_nonce";

/// Keys holding a user's tokens and anything derived from them.
pub const TOKEN_KEYS: [&str; 6] = [
    SESSION_KEY_ID_TOKEN,
    SESSION_KEY_ACCESS_TOKEN,
    SESSION_KEY_PKCE_VERIFIER,
    SESSION_KEY_REFRESH_TOKEN,
    SESSION_KEY_TOKEN_EXPIRES_AT,
    SESSION_KEY_PERMISSIONS,
];

/// Creates a session layer for Axum, backed by process memory
pub fn create_session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    let secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(MemoryStore::default())
        .with_name("clubweb.sid")
        .with_secure(secure)
        .with_http_only(true)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)))
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: BackendClient,
    pub tenants: Arc<TenantCache>,
    pub handoff_key: SealKey,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let backend = BackendClient::new(&config)?;
        let tenants = TenantCache::new(
            backend.clone(),
            Duration::from_secs(config.slug_cache_ttl_secs),
        );
        let handoff_key = SealKey::derive(config.session_secret.expose_secret());

        Ok(Self {
            config: Arc::new(config),
            backend,
            tenants: Arc::new(tenants),
            handoff_key,
        })
    }
}

impl FromRef<AppState> for BackendClient {
    fn from_ref(state: &AppState) -> BackendClient {
        state.backend.clone()
    }
}

impl FromRef<AppState> for Arc<TenantCache> {
    fn from_ref(state: &AppState) -> Arc<TenantCache> {
        state.tenants.clone()
    }
}
