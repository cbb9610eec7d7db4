//! Host → room slug resolution and its cache.

use std::time::Duration;

use clubweb::config::Config;
use clubweb::services::backend::BackendClient;
use clubweb::services::tenancy::{is_allowed_return_url, TenantCache};
use serde_json::json;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn mock_slug(server: &MockServer, host: &str, slug: Option<&str>, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/web/room_slug"))
        .and(header("X-Club-Host", host))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "slug": slug })))
        .expect(calls)
        .mount(server)
        .await;
}

fn cache(server: &MockServer, ttl: Duration) -> (Config, TenantCache) {
    let config = Config::for_tests(&server.uri());
    let backend = BackendClient::new(&config).unwrap();
    (config, TenantCache::new(backend, ttl))
}

#[tokio::test]
async fn test_hit_is_served_from_cache() {
    let server = MockServer::start().await;
    mock_slug(&server, "club.example.test", Some("osc"), 1).await;

    let (_, tenants) = cache(&server, Duration::from_secs(600));

    assert_eq!(tenants.resolve("club.example.test").await.as_deref(), Some("osc"));
    assert_eq!(tenants.resolve("club.example.test").await.as_deref(), Some("osc"));
    assert_eq!(tenants.len().await, 1);
}

#[tokio::test]
async fn test_miss_is_not_cached() {
    let server = MockServer::start().await;
    mock_slug(&server, "unknown.example.test", None, 2).await;

    let (_, tenants) = cache(&server, Duration::from_secs(600));

    assert!(tenants.resolve("unknown.example.test").await.is_none());
    assert!(tenants.resolve("unknown.example.test").await.is_none());
    assert!(tenants.is_empty().await);
}

#[tokio::test]
async fn test_backend_failure_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/room_slug"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let (_, tenants) = cache(&server, Duration::from_secs(600));

    assert!(tenants.resolve("club.example.test").await.is_none());
    assert!(tenants.is_empty().await);
}

#[tokio::test]
async fn test_expired_entries_refetch_and_sweep() {
    let server = MockServer::start().await;
    mock_slug(&server, "club.example.test", Some("osc"), 2).await;

    let (_, tenants) = cache(&server, Duration::ZERO);

    assert_eq!(tenants.resolve("club.example.test").await.as_deref(), Some("osc"));
    assert_eq!(tenants.resolve("club.example.test").await.as_deref(), Some("osc"));

    assert_eq!(tenants.sweep().await, 1);
    assert!(tenants.is_empty().await);
}

#[tokio::test]
async fn test_return_url_guard_uses_known_clubs() {
    let server = MockServer::start().await;
    mock_slug(&server, "club.example.test", Some("osc"), 1).await;
    mock_slug(&server, "evil.example.test", None, 1).await;

    let (config, tenants) = cache(&server, Duration::from_secs(600));

    assert!(is_allowed_return_url(&config, &tenants, "https://club.example.test/login/finish").await);
    assert!(!is_allowed_return_url(&config, &tenants, "https://evil.example.test/login/finish").await);
}
