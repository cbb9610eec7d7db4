//! Client for the platform REST backend.
//!
//! Every page in the front end is a view over one of these calls. The client
//! attaches the bearer id token, the `x-api-key` header and the
//! `X-Club-Host` tenant header as each endpoint requires, and maps HTTP
//! failures onto [`ApiError`] so a 401 can be turned into a fresh login.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::Config;

mod events;
mod financials;
mod rooms;
mod user;
mod web;

pub use financials::Ledger;

pub const CLUB_HOST_HEADER: &str = "X-Club-Host";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Invalid path segment: {0:?}")]
    InvalidSegment(String),
}

/// Percent-encodes one caller-supplied path segment (a slug or league key).
/// Empty and dot segments are rejected since URL parsing would collapse them
/// into a different backend path.
pub(crate) fn segment(raw: &str) -> Result<String, ApiError> {
    if matches!(raw, "" | "." | "..") {
        return Err(ApiError::InvalidSegment(raw.to_string()));
    }
    // form encoding turns a space into '+', which a path would keep literally
    let encoded: String = url::form_urlencoded::byte_serialize(raw.as_bytes()).collect();
    Ok(encoded.replace('+', "%20"))
}

/// Which service an endpoint lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiBase {
    Core,
    Financials,
}

/// Per-call credentials and tenant context.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext<'a> {
    pub bearer: Option<&'a str>,
    pub api_key: bool,
    pub club_host: Option<&'a str>,
}

impl<'a> CallContext<'a> {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn bearer(token: &'a str) -> Self {
        Self {
            bearer: Some(token),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self) -> Self {
        self.api_key = true;
        self
    }

    pub fn with_club_host(mut self, host: &'a str) -> Self {
        self.club_host = Some(host);
        self
    }
}

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    api_base: String,
    fin_api_base: String,
    api_key: Secret<String>,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            fin_api_base: config.fin_api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn url(&self, base: ApiBase, path: &str) -> String {
        let root = match base {
            ApiBase::Core => &self.api_base,
            ApiBase::Financials => &self.fin_api_base,
        };
        format!("{}{}", root, path)
    }

    fn request(
        &self,
        method: Method,
        base: ApiBase,
        path: &str,
        ctx: CallContext<'_>,
    ) -> RequestBuilder {
        let mut builder = self.http.request(method, self.url(base, path));

        if let Some(token) = ctx.bearer {
            builder = builder.bearer_auth(token);
        }
        if ctx.api_key {
            builder = builder.header(API_KEY_HEADER, self.api_key.expose_secret());
        }
        if let Some(host) = ctx.club_host {
            builder = builder.header(CLUB_HOST_HEADER, host);
        }

        builder
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        base: ApiBase,
        path: &str,
        ctx: CallContext<'_>,
    ) -> Result<T, ApiError> {
        let response = self.request(Method::GET, base, path, ctx).send().await?;
        decode(response).await
    }

    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        base: ApiBase,
        path: &str,
        ctx: CallContext<'_>,
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(method, base, path, ctx)
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    /// Sends a request whose response body is ignored.
    pub(crate) async fn send_empty<B>(
        &self,
        method: Method,
        base: ApiBase,
        path: &str,
        ctx: CallContext<'_>,
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut builder = self.request(method, base, path, ctx);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        check_status(response).await.map(|_| ())
    }

    /// Cheap reachability probe used by the health endpoint. Any answer
    /// short of a 5xx counts as reachable.
    #[tracing::instrument(skip(self))]
    pub async fn ping(&self, base: ApiBase) -> Result<(), ApiError> {
        let response = self
            .http
            .head(self.url(base, ""))
            .timeout(Duration::from_secs(3))
            .send()
            .await?;

        if response.status().is_server_error() {
            return Err(ApiError::Status {
                status: response.status().as_u16(),
                body: "Backend unavailable".to_string(),
            });
        }

        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        tracing::warn!(url = %response.url(), "Backend rejected credentials");
        return Err(ApiError::Unauthorized);
    }

    if !status.is_success() {
        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!(status = %status, url = %url, error = %body, "Backend request failed");
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let mut config = Config::for_tests("https://api.example.test/");
        config.fin_api_base = "https://fin.example.test".to_string();
        let client = BackendClient::new(&config).unwrap();

        assert_eq!(
            client.url(ApiBase::Core, "/user/me"),
            "https://api.example.test/user/me"
        );
        assert_eq!(
            client.url(ApiBase::Financials, "/web/financials/room-summary/osc"),
            "https://fin.example.test/web/financials/room-summary/osc"
        );
    }

    #[test]
    fn test_segment_encoding() {
        assert_eq!(segment("spring-2024").unwrap(), "spring-2024");
        assert_eq!(
            segment("../../room/admin/osc/activity?x=").unwrap(),
            "..%2F..%2Froom%2Fadmin%2Fosc%2Factivity%3Fx%3D"
        );
        assert_eq!(segment("a b+c").unwrap(), "a%20b%2Bc");
        assert_eq!(segment("%2e%2e").unwrap(), "%252e%252e");
        assert!(matches!(segment(".."), Err(ApiError::InvalidSegment(_))));
        assert!(matches!(segment("."), Err(ApiError::InvalidSegment(_))));
        assert!(matches!(segment(""), Err(ApiError::InvalidSegment(_))));
    }

    #[test]
    fn test_call_context_builders() {
        let ctx = CallContext::bearer("tok").with_api_key().with_club_host("club.test");
        assert_eq!(ctx.bearer, Some("tok"));
        assert!(ctx.api_key);
        assert_eq!(ctx.club_host, Some("club.test"));

        let public = CallContext::public();
        assert!(public.bearer.is_none());
        assert!(!public.api_key);
    }
}
