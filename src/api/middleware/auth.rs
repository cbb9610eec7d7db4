use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session::{
    AppState, SESSION_KEY_ACCESS_TOKEN, SESSION_KEY_ID_TOKEN, SESSION_KEY_PERMISSIONS,
    SESSION_KEY_REFRESH_TOKEN, SESSION_KEY_TOKEN_EXPIRES_AT, TOKEN_KEYS,
};
use crate::error::{AppError, Result, SessionRejected};
use crate::models::{Permissions, UserClaims, UserInfo};
use crate::services::oauth::cognito::{self, TokenSet};

/// Tokens are refreshed once they are this close to expiring.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// How long fetched permissions are reused from the session.
pub const PERMISSIONS_TTL_SECS: i64 = 300;

/// Tokens as stored in the session.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionTokens {
    pub fn expires_within(&self, now: DateTime<Utc>, secs: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now + chrono::Duration::seconds(secs))
    }
}

pub async fn load_tokens(session: &Session) -> Result<Option<SessionTokens>> {
    let id_token: Option<String> = session.get(SESSION_KEY_ID_TOKEN).await?;
    let access_token: Option<String> = session.get(SESSION_KEY_ACCESS_TOKEN).await?;

    let (Some(id_token), Some(access_token)) = (id_token, access_token) else {
        return Ok(None);
    };

    let refresh_token: Option<String> = session.get(SESSION_KEY_REFRESH_TOKEN).await?;
    let expires_at: Option<i64> = session.get(SESSION_KEY_TOKEN_EXPIRES_AT).await?;

    Ok(Some(SessionTokens {
        id_token,
        access_token,
        refresh_token,
        expires_at: expires_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
    }))
}

/// Stores a fresh token set. Cached permissions are dropped since they
/// belonged to the previous token.
pub async fn store_tokens(session: &Session, tokens: &TokenSet) -> Result<()> {
    session
        .insert(SESSION_KEY_ID_TOKEN, &tokens.id_token)
        .await?;
    session
        .insert(SESSION_KEY_ACCESS_TOKEN, &tokens.access_token)
        .await?;
    match &tokens.refresh_token {
        Some(refresh) => session.insert(SESSION_KEY_REFRESH_TOKEN, refresh).await?,
        None => {
            session.remove_value(SESSION_KEY_REFRESH_TOKEN).await?;
        }
    }
    session
        .insert(SESSION_KEY_TOKEN_EXPIRES_AT, tokens.expires_at.timestamp())
        .await?;
    session.remove_value(SESSION_KEY_PERMISSIONS).await?;
    Ok(())
}

pub async fn clear_tokens(session: &Session) -> Result<()> {
    for key in TOKEN_KEYS {
        session.remove_value(key).await?;
    }
    Ok(())
}

/// Refreshes the session's tokens through the provider. On failure the
/// tokens are cleared.
pub async fn refresh_session(
    state: &AppState,
    session: &Session,
    refresh_token: &str,
) -> Result<TokenSet> {
    match cognito::refresh_tokens(&state.config, refresh_token).await {
        Ok(tokens) => {
            store_tokens(session, &tokens).await?;
            tracing::info!(expires_at = %tokens.expires_at, "Session tokens refreshed");
            Ok(tokens)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Token refresh failed, clearing session");
            clear_tokens(session).await?;
            Err(AppError::Unauthorized)
        }
    }
}

/// The caller's login state, resolved from the session.
///
/// Tokens close to expiry are refreshed before the handler runs, and a token
/// whose payload cannot be decoded logs the caller out.
pub struct AuthContext {
    pub session: Session,
    pub tokens: Option<SessionTokens>,
    pub claims: Option<UserClaims>,
}

impl AuthContext {
    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn id_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.id_token.as_str())
    }

    pub fn display_label(&self) -> Option<&str> {
        self.claims.as_ref().map(UserClaims::display_label)
    }

    /// The id token, or a redirect to login.
    pub fn require(&self) -> Result<&str> {
        self.id_token().ok_or(AppError::Unauthorized)
    }

    pub fn into_user(self) -> Option<CurrentUser> {
        match (self.tokens, self.claims) {
            (Some(tokens), Some(claims)) => Some(CurrentUser {
                session: self.session,
                id_token: tokens.id_token,
                claims,
            }),
            _ => None,
        }
    }

    async fn resolve(state: &AppState, session: Session) -> Result<Self> {
        let Some(mut tokens) = load_tokens(&session).await? else {
            return Ok(Self::anonymous(session));
        };

        if tokens.expires_within(Utc::now(), REFRESH_MARGIN_SECS) {
            if let Some(refresh) = tokens.refresh_token.clone() {
                match refresh_session(state, &session, &refresh).await {
                    Ok(fresh) => {
                        tokens = SessionTokens {
                            id_token: fresh.id_token,
                            access_token: fresh.access_token,
                            refresh_token: fresh.refresh_token,
                            expires_at: Some(fresh.expires_at),
                        };
                    }
                    Err(AppError::Unauthorized) => return Ok(Self::anonymous(session)),
                    Err(e) => return Err(e),
                }
            }
        }

        match UserClaims::from_id_token(&tokens.id_token) {
            Some(claims) => Ok(Self {
                session,
                tokens: Some(tokens),
                claims: Some(claims),
            }),
            None => {
                tracing::error!("Invalid id token in session, clearing");
                clear_tokens(&session).await?;
                Ok(Self::anonymous(session))
            }
        }
    }

    fn anonymous(session: Session) -> Self {
        Self {
            session,
            tokens: None,
            claims: None,
        }
    }
}

async fn session_from_parts(parts: &mut Parts, state: &AppState) -> Result<Session> {
    Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| AppError::Internal(anyhow::anyhow!(msg)))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let session = session_from_parts(parts, state).await?;
        AuthContext::resolve(state, session).await
    }
}

/// An authenticated caller; extraction redirects anonymous callers to login.
pub struct CurrentUser {
    pub session: Session,
    pub id_token: String,
    pub claims: UserClaims,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        AuthContext::from_request_parts(parts, state)
            .await?
            .into_user()
            .ok_or(AppError::Unauthorized)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedPermissions {
    room_slug: Option<String>,
    fetched_at: i64,
    permissions: Permissions,
}

async fn cache_permissions(
    session: &Session,
    room_slug: Option<&str>,
    permissions: &Permissions,
) -> Result<()> {
    let cached = CachedPermissions {
        room_slug: room_slug.map(str::to_string),
        fetched_at: Utc::now().timestamp(),
        permissions: permissions.clone(),
    };
    session.insert(SESSION_KEY_PERMISSIONS, cached).await?;
    Ok(())
}

/// The caller's permissions for `room_slug`, reusing the session copy while
/// it is fresh.
pub async fn permissions_for(
    state: &AppState,
    user: &CurrentUser,
    room_slug: Option<&str>,
) -> Result<Permissions> {
    let cached: Option<CachedPermissions> = user.session.get(SESSION_KEY_PERMISSIONS).await?;
    if let Some(cached) = cached {
        let age = Utc::now().timestamp() - cached.fetched_at;
        if cached.room_slug.as_deref() == room_slug && (0..PERMISSIONS_TTL_SECS).contains(&age) {
            return Ok(cached.permissions);
        }
    }

    let permissions = state
        .backend
        .my_permissions(&user.id_token, room_slug)
        .await?;
    cache_permissions(&user.session, room_slug, &permissions).await?;
    Ok(permissions)
}

/// Loads the caller's profile and permissions together. Both requests run
/// concurrently and the results are only used once both succeed.
pub async fn load_profile(
    state: &AppState,
    user: &CurrentUser,
    room_slug: Option<&str>,
) -> Result<(UserInfo, Permissions)> {
    let (info, permissions) = tokio::try_join!(
        state.backend.user_me(&user.id_token),
        state.backend.my_permissions(&user.id_token, room_slug),
    )?;
    cache_permissions(&user.session, room_slug, &permissions).await?;
    Ok((info, permissions))
}

/// Gate for a single permission tag.
pub async fn require_permission(
    state: &AppState,
    user: &CurrentUser,
    room_slug: Option<&str>,
    permission: &str,
) -> Result<Permissions> {
    let permissions = permissions_for(state, user, room_slug).await?;
    if !permissions.has(permission) {
        tracing::warn!(sub = %user.claims.sub, permission = %permission, "Permission denied");
        return Err(AppError::Forbidden);
    }
    Ok(permissions)
}

/// Clears the session tokens when a handler reports that the backend
/// rejected them.
pub async fn expire_rejected_session(session: Session, request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if response.extensions().get::<SessionRejected>().is_some() {
        if let Err(e) = clear_tokens(&session).await {
            tracing::error!(error = %e, "Failed to clear rejected session");
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tokens(expires_at: Option<DateTime<Utc>>) -> SessionTokens {
        SessionTokens {
            id_token: "a.b.c".to_string(),
            access_token: "access".to_string(),
            refresh_token: None,
            expires_at,
        }
    }

    #[test]
    fn test_expires_within() {
        let now = Utc::now();

        assert!(tokens(Some(now + Duration::seconds(30))).expires_within(now, REFRESH_MARGIN_SECS));
        assert!(tokens(Some(now - Duration::seconds(5))).expires_within(now, REFRESH_MARGIN_SECS));
        assert!(!tokens(Some(now + Duration::minutes(10))).expires_within(now, REFRESH_MARGIN_SECS));
        assert!(!tokens(None).expires_within(now, REFRESH_MARGIN_SECS));
    }
}
