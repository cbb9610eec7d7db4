use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, ExtraTokenFields,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    StandardRevocableToken, StandardTokenResponse, TokenResponse as OAuth2TokenResponse,
    TokenUrl,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;

#[derive(thiserror::Error, Debug)]
pub enum CognitoError {
    #[error("OAuth URL construction failed: {0}")]
    UrlConstruction(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Token response carried no id_token")]
    MissingIdToken,
}

/// The provider returns the OIDC `id_token` next to the OAuth2 fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdTokenFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

type CognitoTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

type CognitoClient = Client<
    BasicErrorResponse,
    CognitoTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

pub const LOGIN_SCOPES: [&str; 2] = ["email", "openid"];

/// Tokens held in a user's session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// A prepared redirect to the hosted login page.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub url: String,
    pub state: String,
    pub pkce_verifier: String,
}

/// Builds the provider client. The app client is public, so without a
/// secret the client id travels in the token request body.
fn build_oauth_client(config: &Config) -> Result<CognitoClient, CognitoError> {
    let origin = config.oauth_origin();
    let redirect_url = RedirectUrl::new(config.oauth_redirect_uri.clone())
        .map_err(|e| CognitoError::UrlConstruction(e.to_string()))?;

    let client = CognitoClient::new(
        ClientId::new(config.oauth_client_id.clone()),
        config
            .oauth_client_secret
            .as_ref()
            .map(|s| ClientSecret::new(s.expose_secret().clone())),
        AuthUrl::new(format!("{}/oauth2/authorize", origin))
            .map_err(|e| CognitoError::UrlConstruction(e.to_string()))?,
        Some(
            TokenUrl::new(format!("{}/oauth2/token", origin))
                .map_err(|e| CognitoError::UrlConstruction(e.to_string()))?,
        ),
    )
    .set_redirect_uri(redirect_url);

    Ok(client)
}

/// Generates the authorization URL with a fresh S256 PKCE pair and nonce.
pub fn build_auth_url(config: &Config) -> Result<AuthRequest, CognitoError> {
    let client = build_oauth_client(config)?;
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (auth_url, csrf_token) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(LOGIN_SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .set_pkce_challenge(pkce_challenge)
        .url();

    Ok(AuthRequest {
        url: auth_url.to_string(),
        state: csrf_token.secret().clone(),
        pkce_verifier: pkce_verifier.secret().clone(),
    })
}

fn expires_at(response: &CognitoTokenResponse, now: DateTime<Utc>) -> DateTime<Utc> {
    let expires_in = response
        .expires_in()
        .unwrap_or(std::time::Duration::from_secs(3600));
    now + Duration::seconds(expires_in.as_secs() as i64)
}

/// Exchanges an authorization code for tokens.
#[tracing::instrument(skip(config, code, pkce_verifier))]
pub async fn exchange_code(
    config: &Config,
    code: &str,
    pkce_verifier: &str,
) -> Result<TokenSet, CognitoError> {
    let client = build_oauth_client(config)?;

    let response = client
        .exchange_code(AuthorizationCode::new(code.to_string()))
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
        .request_async(async_http_client)
        .await
        .map_err(|e| CognitoError::TokenExchange(e.to_string()))?;

    let id_token = response
        .extra_fields()
        .id_token
        .clone()
        .ok_or(CognitoError::MissingIdToken)?;

    Ok(TokenSet {
        id_token,
        access_token: response.access_token().secret().clone(),
        refresh_token: response.refresh_token().map(|t| t.secret().clone()),
        expires_at: expires_at(&response, Utc::now()),
    })
}

/// Trades a refresh token for fresh id and access tokens.
#[tracing::instrument(skip(config, refresh_token))]
pub async fn refresh_tokens(config: &Config, refresh_token: &str) -> Result<TokenSet, CognitoError> {
    let client = build_oauth_client(config)?;

    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
        .request_async(async_http_client)
        .await
        .map_err(|e| CognitoError::TokenRefresh(e.to_string()))?;

    let id_token = response
        .extra_fields()
        .id_token
        .clone()
        .ok_or(CognitoError::MissingIdToken)?;

    Ok(TokenSet {
        id_token,
        access_token: response.access_token().secret().clone(),
        // The provider does not rotate refresh tokens; keep the old one if none came back
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| Some(refresh_token.to_string())),
        expires_at: expires_at(&response, Utc::now()),
    })
}

fn logout_callback_uri(config: &Config) -> String {
    format!("https://{}/logout/callback", config.auth_host)
}

fn provider_logout_url(config: &Config) -> Result<Url, CognitoError> {
    Url::parse(&format!("{}/logout", config.oauth_origin()))
        .map_err(|e| CognitoError::UrlConstruction(e.to_string()))
}

fn encode_component(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// Provider logout for a club site. The club origin rides in the fragment so
/// the auth host's callback page can send the browser back.
pub fn club_logout_url(config: &Config, club_origin: &str) -> Result<String, CognitoError> {
    let mut url = provider_logout_url(config)?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.oauth_client_id)
        .append_pair("logout_uri", &logout_callback_uri(config));
    url.set_fragment(Some(&format!("return={}", encode_component(club_origin))));
    Ok(url.to_string())
}

/// Provider logout started on the auth host itself.
pub fn auth_host_logout_url(config: &Config, state: &str) -> Result<String, CognitoError> {
    let callback = logout_callback_uri(config);
    let mut url = provider_logout_url(config)?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.oauth_client_id)
        .append_pair("logout_uri", &callback)
        .append_pair("redirect_uri", &callback);
    url.set_fragment(Some(&format!("state={}", encode_component(state))));
    Ok(url.to_string())
}
