use chrono_tz::Tz;
use secrecy::Secret;
use serde::Deserialize;

use crate::models::room::DEFAULT_TIMEZONE;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub host: String,
    pub port: u16,

    // Platform REST backend
    pub api_base: String,
    pub fin_api_base: String,
    pub api_key: Secret<String>,

    // OAuth2/OIDC provider (hosted UI)
    pub oauth_domain: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: Option<Secret<String>>,
    pub oauth_redirect_uri: String,

    // Tenancy
    pub auth_host: String,
    pub platform_hosts: Vec<String>,
    pub default_return_url: String,
    pub asset_base: String,
    /// Wall clock for rooms whose own timezone is unknown.
    pub timezone: Tz,

    // Security
    pub session_secret: Secret<String>,

    // Tuning
    pub request_timeout_secs: u64,
    pub slug_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        let api_base: String = config.get("api_base")?;
        let auth_host: String = config.get("auth_host")?;
        let timezone: String = config
            .get("timezone")
            .unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());

        Ok(Self {
            base_url: config.get("base_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            fin_api_base: config
                .get("fin_api_base")
                .unwrap_or_else(|_| api_base.clone()),
            api_base,
            api_key: Secret::new(config.get("api_key")?),

            oauth_domain: config.get("oauth_domain")?,
            oauth_client_id: config.get("oauth_client_id")?,
            oauth_client_secret: config
                .get::<String>("oauth_client_secret")
                .ok()
                .filter(|s| !s.is_empty())
                .map(Secret::new),
            oauth_redirect_uri: config
                .get("oauth_redirect_uri")
                .unwrap_or_else(|_| format!("https://{}/login/callback", auth_host)),

            platform_hosts: config
                .get::<String>("platform_hosts")
                .map(|raw| parse_host_list(&raw))
                .unwrap_or_default(),
            default_return_url: config.get("default_return_url")?,
            asset_base: config
                .get("asset_base")
                .unwrap_or_else(|_| "https://d2o72uxgym8vs9.cloudfront.net".to_string()),
            auth_host: auth_host.to_lowercase(),
            timezone: timezone.parse().map_err(|e| {
                config::ConfigError::Message(format!("invalid timezone {:?}: {}", timezone, e))
            })?,

            session_secret: Secret::new(config.get("session_secret")?),

            request_timeout_secs: config.get("request_timeout_secs").unwrap_or(10),
            slug_cache_ttl_secs: config.get("slug_cache_ttl_secs").unwrap_or(600),
        })
    }

    /// Origin of the identity provider, `https://` is assumed when the
    /// configured domain carries no scheme.
    pub fn oauth_origin(&self) -> String {
        let domain = self.oauth_domain.trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        }
    }

    pub fn is_platform_host(&self, host: &str) -> bool {
        self.platform_hosts.iter().any(|h| h == host)
    }

    /// Configuration pointing every outbound interface at `api_base`,
    /// used by unit and integration tests.
    pub fn for_tests(api_base: &str) -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_base: api_base.to_string(),
            fin_api_base: api_base.to_string(),
            api_key: Secret::new("test-api-key".to_string()),
            oauth_domain: api_base.to_string(),
            oauth_client_id: "test-client".to_string(),
            oauth_client_secret: None,
            oauth_redirect_uri: "https://auth.example.test/login/callback".to_string(),
            auth_host: "auth.example.test".to_string(),
            platform_hosts: vec!["www.example.test".to_string()],
            default_return_url: "https://club.example.test/login/finish".to_string(),
            asset_base: "https://assets.example.test".to_string(),
            timezone: chrono_tz::America::Toronto,
            session_secret: Secret::new("test-session-secret".to_string()),
            request_timeout_secs: 5,
            slug_cache_ttl_secs: 600,
        }
    }
}

fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}
