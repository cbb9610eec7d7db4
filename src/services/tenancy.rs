//! Maps request hosts onto sites and tenants.
//!
//! One deployment serves the auth host, the platform's own site and every
//! club site. Club hosts are resolved to a room slug through the backend and
//! the answer is cached per host.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use url::Url;

use crate::config::Config;
use crate::services::backend::BackendClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteKind {
    /// The shared login host that owns the provider callback.
    Auth,
    /// The platform's own marketing and admin site.
    Platform,
    /// A club site, by normalized host.
    Club(String),
}

/// Lowercases a `Host` header value and strips any port.
pub fn normalize_host(raw: &str) -> String {
    let raw = raw.trim();
    let host = if let Some(rest) = raw.strip_prefix('[') {
        // [v6]:port
        rest.split(']').next().unwrap_or(rest)
    } else {
        raw.rsplit_once(':')
            .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
            .map(|(host, _)| host)
            .unwrap_or(raw)
    };
    host.trim_end_matches('.').to_lowercase()
}

pub fn classify(config: &Config, raw_host: &str) -> SiteKind {
    let host = normalize_host(raw_host);
    if host == config.auth_host {
        SiteKind::Auth
    } else if config.is_platform_host(&host) {
        SiteKind::Platform
    } else {
        SiteKind::Club(host)
    }
}

struct CachedSlug {
    slug: String,
    fetched_at: Instant,
}

/// Process-wide host → room slug cache.
pub struct TenantCache {
    backend: BackendClient,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedSlug>>,
}

impl TenantCache {
    pub fn new(backend: BackendClient, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Room slug served at `host`. Unknown hosts and backend failures both
    /// yield `None` and are not cached.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, host: &str) -> Option<String> {
        if let Some(entry) = self.entries.read().await.get(host) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Some(entry.slug.clone());
            }
        }

        match self.backend.room_slug(host).await {
            Ok(Some(slug)) => {
                tracing::debug!(host = %host, room_slug = %slug, "Resolved room slug");
                self.entries.write().await.insert(
                    host.to_string(),
                    CachedSlug {
                        slug: slug.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                Some(slug)
            }
            Ok(None) => {
                tracing::info!(host = %host, "No room registered for host");
                None
            }
            Err(e) => {
                tracing::error!(host = %host, error = %e, "Error getting room slug");
                None
            }
        }
    }

    /// Drops expired entries, returning how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Accepts a post-login return URL only when it is http(s) and points at a
/// platform host or a known club.
pub async fn is_allowed_return_url(config: &Config, tenants: &TenantCache, raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };

    match classify(config, host) {
        SiteKind::Platform => true,
        SiteKind::Auth => false,
        SiteKind::Club(host) => tenants.resolve(&host).await.is_some(),
    }
}

/// The requested return URL when allowed, the configured default otherwise.
pub async fn return_url_or_default(
    config: &Config,
    tenants: &TenantCache,
    requested: Option<&str>,
) -> String {
    match requested {
        Some(raw) if is_allowed_return_url(config, tenants, raw).await => raw.to_string(),
        Some(raw) => {
            tracing::warn!(return_url = %raw, "Rejected return URL");
            config.default_return_url.clone()
        }
        None => config.default_return_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Club.Example.TEST:8080"), "club.example.test");
        assert_eq!(normalize_host("club.example.test."), "club.example.test");
        assert_eq!(normalize_host("[::1]:3000"), "::1");
        assert_eq!(normalize_host("localhost"), "localhost");
    }

    #[test]
    fn test_classify() {
        let config = Config::for_tests("http://backend.test");

        assert_eq!(classify(&config, "AUTH.example.test:443"), SiteKind::Auth);
        assert_eq!(classify(&config, "www.example.test"), SiteKind::Platform);
        assert_eq!(
            classify(&config, "Club.Example.test:3000"),
            SiteKind::Club("club.example.test".to_string())
        );
    }

    #[tokio::test]
    async fn test_return_url_scheme_and_host_checks() {
        let config = Config::for_tests("http://127.0.0.1:9");
        let backend = BackendClient::new(&config).unwrap();
        let tenants = TenantCache::new(backend, Duration::from_secs(60));

        assert!(is_allowed_return_url(&config, &tenants, "https://www.example.test/login/finish").await);
        assert!(!is_allowed_return_url(&config, &tenants, "javascript:alert(1)").await);
        assert!(!is_allowed_return_url(&config, &tenants, "ftp://www.example.test/").await);
        assert!(!is_allowed_return_url(&config, &tenants, "https://auth.example.test/").await);
        assert!(!is_allowed_return_url(&config, &tenants, "/relative").await);

        assert_eq!(
            return_url_or_default(&config, &tenants, Some("data:text/html,hi")).await,
            config.default_return_url
        );
    }
}
