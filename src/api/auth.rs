use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use url::Url;

use crate::api::layout::{Layout, MessageTemplate};
use crate::api::middleware::auth::{clear_tokens, store_tokens};
use crate::api::middleware::session::{
    AppState, SESSION_KEY_HANDOFF_NONCE, SESSION_KEY_LOGIN_NONCE, SESSION_KEY_OAUTH_STATE,
    SESSION_KEY_PKCE_VERIFIER, SESSION_KEY_RETURN_URL,
};
use crate::api::middleware::site::Site;
use crate::error::{AppError, Result};
use crate::services::oauth::cognito::{self, TokenSet};
use crate::services::oauth::handoff::{self, Handoff};
use crate::services::tenancy;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/login/callback", get(login_callback))
        .route("/login/finish", get(login_finish))
        .route("/logout", get(logout))
        .route("/logout/callback", get(logout_callback))
}

#[derive(Template)]
#[template(path = "logout_callback.html")]
struct LogoutCallbackTemplate {
    layout: Layout,
}

#[derive(Deserialize)]
struct StateQuery {
    state: Option<String>,
}

#[derive(Deserialize)]
struct LoginQuery {
    state: Option<String>,
    nonce: Option<String>,
}

/// Unknown paths on the auth host.
pub fn unknown_auth_route() -> Response {
    (
        StatusCode::NOT_FOUND,
        MessageTemplate::new(Layout::bare("Auth"), "Unknown auth route", ""),
    )
        .into_response()
}

fn not_on_this_host() -> AppError {
    AppError::NotFound("Page not found".to_string())
}

/// Starts a login. Club and platform sites hand off to the auth host; the
/// auth host prepares PKCE and sends the browser to the provider.
async fn login(
    State(state): State<AppState>,
    site: Site,
    Query(params): Query<LoginQuery>,
    session: Session,
) -> Result<Redirect> {
    if !site.is_auth() {
        let nonce = handoff::new_nonce();
        session.insert(SESSION_KEY_LOGIN_NONCE, &nonce).await?;

        let mut url = Url::parse(&format!("https://{}/login", state.config.auth_host))
            .map_err(|e| AppError::Internal(e.into()))?;
        url.query_pairs_mut()
            .append_pair("state", &format!("{}/login/finish", site.origin))
            .append_pair("nonce", &nonce);
        tracing::info!(origin = %site.origin, "Sending login to auth host");
        return Ok(Redirect::to(url.as_str()));
    }

    let return_url =
        tenancy::return_url_or_default(&state.config, &state.tenants, params.state.as_deref())
            .await;

    let request =
        cognito::build_auth_url(&state.config).map_err(|e| AppError::OAuth(e.to_string()))?;

    session
        .insert(SESSION_KEY_PKCE_VERIFIER, &request.pkce_verifier)
        .await?;
    session
        .insert(SESSION_KEY_OAUTH_STATE, &request.state)
        .await?;
    session.insert(SESSION_KEY_RETURN_URL, &return_url).await?;
    // Without a nonce the handoff is one no club session accepts
    session
        .insert(SESSION_KEY_HANDOFF_NONCE, params.nonce.unwrap_or_default())
        .await?;

    tracing::info!(return_url = %return_url, "Redirecting to identity provider");

    Ok(Redirect::to(&request.url))
}

#[derive(Deserialize)]
struct OAuthCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Provider callback on the auth host: exchanges the code and hands the
/// sealed tokens to the site the login started from.
async fn login_callback(
    State(state): State<AppState>,
    site: Site,
    Query(params): Query<OAuthCallback>,
    session: Session,
) -> Result<Redirect> {
    if !site.is_auth() {
        return Err(not_on_this_host());
    }

    let verifier: Option<String> = session.remove(SESSION_KEY_PKCE_VERIFIER).await?;
    let expected_state: Option<String> = session.remove(SESSION_KEY_OAUTH_STATE).await?;
    let return_url: String = session
        .remove(SESSION_KEY_RETURN_URL)
        .await?
        .unwrap_or_else(|| state.config.default_return_url.clone());
    let nonce: String = session
        .remove(SESSION_KEY_HANDOFF_NONCE)
        .await?
        .unwrap_or_default();

    if let Some(error) = &params.error {
        tracing::warn!(error = %error, "Provider returned an error");
        return Ok(Redirect::to(&return_url));
    }

    let (Some(code), Some(verifier)) = (params.code.as_deref(), verifier) else {
        tracing::error!("Missing code or verifier");
        return Ok(Redirect::to(&return_url));
    };

    if expected_state.is_none() || expected_state != params.state {
        tracing::error!("OAuth state mismatch");
        return Ok(Redirect::to(&return_url));
    }

    let tokens = match cognito::exchange_code(&state.config, code, &verifier).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!(error = %e, "Token exchange error");
            return Ok(Redirect::to(&return_url));
        }
    };

    let blob = Handoff::new(&tokens, nonce, Utc::now())
        .seal(&state.handoff_key)
        .map_err(|e| AppError::Internal(e.into()))?;

    let mut target = Url::parse(&return_url).map_err(|e| AppError::Internal(e.into()))?;
    target.query_pairs_mut().append_pair("handoff", &blob);

    tracing::info!(return_url = %return_url, "Login complete, handing off tokens");

    Ok(Redirect::to(target.as_str()))
}

#[derive(Deserialize)]
struct FinishQuery {
    handoff: Option<String>,
}

/// Club side of the handoff: stores the tokens in this site's session when
/// the bundle was issued for the login this browser started.
async fn login_finish(
    State(state): State<AppState>,
    Query(params): Query<FinishQuery>,
    session: Session,
) -> Result<Redirect> {
    // One handoff per started login
    let expected_nonce: Option<String> = session.remove(SESSION_KEY_LOGIN_NONCE).await?;

    let Some(blob) = params.handoff else {
        tracing::error!("Missing token handoff");
        return Ok(Redirect::to("/"));
    };

    let handoff = match Handoff::open(&state.handoff_key, &blob, Utc::now()) {
        Ok(handoff) => handoff,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected token handoff");
            return Ok(Redirect::to("/"));
        }
    };

    if !handoff.matches_nonce(expected_nonce.as_deref()) {
        tracing::warn!(
            has_login = expected_nonce.is_some(),
            "Token handoff does not belong to this browser's login"
        );
        return Ok(Redirect::to("/"));
    }

    let tokens = TokenSet {
        id_token: handoff.id_token,
        access_token: handoff.access_token,
        refresh_token: handoff.refresh_token,
        expires_at: DateTime::from_timestamp(handoff.expires_at, 0).unwrap_or_else(Utc::now),
    };

    // A new login never inherits another session's id
    session.cycle_id().await?;
    store_tokens(&session, &tokens).await?;

    tracing::info!("Member signed in");

    Ok(Redirect::to("/"))
}

/// Clears the local tokens and signs out at the provider.
async fn logout(
    State(state): State<AppState>,
    site: Site,
    Query(params): Query<StateQuery>,
    session: Session,
) -> Result<Redirect> {
    if site.is_auth() {
        let target = params.state.as_deref().unwrap_or("/");
        let url = cognito::auth_host_logout_url(&state.config, target)
            .map_err(|e| AppError::OAuth(e.to_string()))?;
        return Ok(Redirect::to(&url));
    }

    clear_tokens(&session).await?;

    let url = cognito::club_logout_url(&state.config, &site.origin)
        .map_err(|e| AppError::OAuth(e.to_string()))?;

    tracing::info!(origin = %site.origin, "Logging out");

    Ok(Redirect::to(&url))
}

/// The provider sends the browser here after logout. The return target sits
/// in the URL fragment, so the page reads it client-side.
async fn logout_callback(site: Site, session: Session) -> Result<Response> {
    if !site.is_auth() {
        return Err(not_on_this_host());
    }

    session.flush().await?;

    Ok(LogoutCallbackTemplate {
        layout: Layout::bare("Logging out"),
    }
    .into_response())
}
