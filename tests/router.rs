//! End-to-end requests through the assembled router, with the backend and the
//! identity provider mocked.

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, HOST, LOCATION, SET_COOKIE},
        Method, Request, StatusCode,
    },
    response::Response,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use clubweb::api::middleware::session::AppState;
use clubweb::config::Config;
use clubweb::services::encryption::SealKey;
use clubweb::services::oauth::cognito::{club_logout_url, TokenSet};
use clubweb::services::oauth::handoff::Handoff;

const CLUB_HOST: &str = "club.example.test";
const AUTH_HOST: &str = "auth.example.test";
const PLATFORM_HOST: &str = "www.example.test";

fn app(server: &MockServer) -> Router {
    let state = AppState::new(Config::for_tests(&server.uri())).unwrap();
    clubweb::api::router(state)
}

fn request(
    method: Method,
    host: &str,
    uri: &str,
    cookie: Option<&str>,
    json_body: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header(HOST, host);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    match json_body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get(host: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    request(Method::GET, host, uri, cookie, None)
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn session_cookie(response: &Response) -> String {
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("clubweb.sid="));
    cookie
}

fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn fake_id_token(sub: &str, email: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": sub, "email": email }).to_string());
    format!("{}.{}.sig", header, payload)
}

fn sealed_handoff(nonce: &str) -> String {
    let tokens = TokenSet {
        id_token: fake_id_token("user-1", "member@example.test"),
        access_token: "access".to_string(),
        refresh_token: Some("refresh".to_string()),
        expires_at: Utc::now() + Duration::hours(1),
    };
    Handoff::new(&tokens, nonce.to_string(), Utc::now())
        .seal(&SealKey::derive("test-session-secret"))
        .unwrap()
}

/// Starts a login on a club or platform host, returning the session cookie
/// and the nonce forwarded to the auth host.
async fn start_login(app: &Router, host: &str) -> (String, String) {
    let response = app.clone().oneshot(get(host, "/login", None)).await.unwrap();
    assert!(response.status().is_redirection());
    let nonce = query_param(&location(&response), "nonce").unwrap();
    (session_cookie(&response), nonce)
}

/// Completes a login the way the auth host's handoff would, returning the
/// signed-in session cookie.
async fn sign_in(app: &Router, host: &str) -> String {
    let (cookie, nonce) = start_login(app, host).await;
    let uri = format!("/login/finish?handoff={}", sealed_handoff(&nonce));
    let response = app
        .clone()
        .oneshot(get(host, &uri, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(location(&response), "/");
    session_cookie(&response)
}

async fn mount_permissions(server: &MockServer, global: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/user/web/mypermissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_id": "7",
            "global_permissions": global,
            "room_permissions": [],
            "event_permissions": []
        })))
        .mount(server)
        .await;
}

async fn mount_profile(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/user/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "email": "member@example.test"
        })))
        .mount(server)
        .await;
}

async fn mount_token_endpoint(server: &MockServer, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access",
            "id_token": fake_id_token("user-1", "member@example.test"),
            "refresh_token": "refresh",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(calls)
        .mount(server)
        .await;
}

async fn is_signed_in(app: &Router, host: &str, cookie: &str) -> bool {
    let response = app
        .clone()
        .oneshot(get(host, "/account", Some(cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    !body_text(response).await.contains("Not logged in.")
}

#[tokio::test]
async fn test_health_reports_reachable_backend() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(get(CLUB_HOST, "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_admin_without_session_redirects_to_login() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(get(CLUB_HOST, "/admin", None))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_unknown_auth_route_is_not_found() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(get(AUTH_HOST, "/leagues", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Unknown auth route"));
}

#[tokio::test]
async fn test_club_login_goes_to_auth_host_with_nonce() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(get(CLUB_HOST, "/login", None))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let target = location(&response);
    assert!(target.starts_with("https://auth.example.test/login?"));
    assert_eq!(
        query_param(&target, "state").as_deref(),
        Some("http://club.example.test/login/finish")
    );
    assert!(query_param(&target, "nonce").is_some_and(|n| n.len() >= 16));
    session_cookie(&response);
}

#[tokio::test]
async fn test_auth_login_runs_pkce_code_flow() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;
    let app = app(&server);

    let uri = "/login?state=https%3A%2F%2Fwww.example.test%2Flogin%2Ffinish&nonce=club-nonce";
    let response = app.clone().oneshot(get(AUTH_HOST, uri, None)).await.unwrap();
    assert!(response.status().is_redirection());

    let provider = location(&response);
    assert!(provider.starts_with(&format!("{}/oauth2/authorize?", server.uri())));
    assert_eq!(
        query_param(&provider, "code_challenge_method").as_deref(),
        Some("S256")
    );
    let challenge = query_param(&provider, "code_challenge").unwrap();
    let oauth_state = query_param(&provider, "state").unwrap();
    let cookie = session_cookie(&response);

    let callback = format!("/login/callback?code=the-code&state={}", oauth_state);
    let response = app
        .clone()
        .oneshot(get(AUTH_HOST, &callback, Some(&cookie)))
        .await
        .unwrap();
    let target = location(&response);
    assert!(target.starts_with("https://www.example.test/login/finish?handoff="));

    // The verifier kept in the session answers the challenge sent to the provider
    let requests = server.received_requests().await.unwrap();
    let token_request = requests
        .iter()
        .find(|r| r.url.path() == "/oauth2/token")
        .unwrap();
    let verifier = url::form_urlencoded::parse(&token_request.body)
        .find(|(k, _)| k == "code_verifier")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    let digest = ring::digest::digest(&ring::digest::SHA256, verifier.as_bytes());
    assert_eq!(URL_SAFE_NO_PAD.encode(digest.as_ref()), challenge);

    let blob = query_param(&target, "handoff").unwrap();
    let handoff = Handoff::open(&SealKey::derive("test-session-secret"), &blob, Utc::now()).unwrap();
    assert_eq!(handoff.nonce, "club-nonce");
    assert_eq!(handoff.access_token, "access");
    assert_eq!(handoff.refresh_token.as_deref(), Some("refresh"));
}

#[tokio::test]
async fn test_callback_state_mismatch_gives_no_handoff() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 0).await;
    let app = app(&server);

    let uri = "/login?state=https%3A%2F%2Fwww.example.test%2Flogin%2Ffinish&nonce=club-nonce";
    let response = app.clone().oneshot(get(AUTH_HOST, uri, None)).await.unwrap();
    let oauth_state = query_param(&location(&response), "state").unwrap();
    let cookie = session_cookie(&response);

    let response = app
        .clone()
        .oneshot(get(
            AUTH_HOST,
            "/login/callback?code=the-code&state=forged",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(location(&response), "https://www.example.test/login/finish");

    // The verifier went with the failed attempt
    let callback = format!("/login/callback?code=the-code&state={}", oauth_state);
    let response = app
        .oneshot(get(AUTH_HOST, &callback, Some(&cookie)))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert!(!location(&response).contains("handoff="));
}

#[tokio::test]
async fn test_tampered_handoff_is_ignored() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(get(CLUB_HOST, "/login/finish?handoff=bm90LXNlYWxlZA", None))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_handoff_for_another_login_is_rejected() {
    let server = MockServer::start().await;
    let app = app(&server);

    let (cookie, nonce) = start_login(&app, CLUB_HOST).await;
    assert_ne!(nonce, "someone-elses-login");

    let uri = format!("/login/finish?handoff={}", sealed_handoff("someone-elses-login"));
    let response = app
        .clone()
        .oneshot(get(CLUB_HOST, &uri, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(location(&response), "/");
    assert!(!is_signed_in(&app, CLUB_HOST, &cookie).await);

    // The browser's own nonce was spent by the rejected attempt
    let uri = format!("/login/finish?handoff={}", sealed_handoff(&nonce));
    app.clone()
        .oneshot(get(CLUB_HOST, &uri, Some(&cookie)))
        .await
        .unwrap();
    assert!(!is_signed_in(&app, CLUB_HOST, &cookie).await);
}

#[tokio::test]
async fn test_handoff_cannot_be_replayed() {
    let server = MockServer::start().await;
    mount_profile(&server).await;
    mount_permissions(&server, &[]).await;
    let app = app(&server);

    let (cookie, nonce) = start_login(&app, CLUB_HOST).await;
    let uri = format!("/login/finish?handoff={}", sealed_handoff(&nonce));
    let response = app
        .clone()
        .oneshot(get(CLUB_HOST, &uri, Some(&cookie)))
        .await
        .unwrap();
    let cookie = session_cookie(&response);
    assert!(is_signed_in(&app, CLUB_HOST, &cookie).await);

    let response = app
        .clone()
        .oneshot(get(CLUB_HOST, "/logout", Some(&cookie)))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert!(!is_signed_in(&app, CLUB_HOST, &cookie).await);

    let response = app
        .clone()
        .oneshot(get(CLUB_HOST, &uri, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(location(&response), "/");
    assert!(!is_signed_in(&app, CLUB_HOST, &cookie).await);
}

#[tokio::test]
async fn test_club_logout_signs_out_at_provider() {
    let server = MockServer::start().await;
    mount_profile(&server).await;
    mount_permissions(&server, &[]).await;
    let app = app(&server);

    let cookie = sign_in(&app, CLUB_HOST).await;
    assert!(is_signed_in(&app, CLUB_HOST, &cookie).await);

    let response = app
        .clone()
        .oneshot(get(CLUB_HOST, "/logout", Some(&cookie)))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let expected =
        club_logout_url(&Config::for_tests(&server.uri()), "http://club.example.test").unwrap();
    assert_eq!(location(&response), expected);
    assert!(expected.starts_with(&format!("{}/logout?client_id=test-client", server.uri())));
    assert!(!is_signed_in(&app, CLUB_HOST, &cookie).await);
}

#[tokio::test]
async fn test_handoff_signs_in_until_backend_rejects_token() {
    let server = MockServer::start().await;
    let app = app(&server);

    let cookie = sign_in(&app, CLUB_HOST).await;

    mount_profile(&server).await;
    mount_permissions(&server, &[]).await;

    let response = app
        .clone()
        .oneshot(get(CLUB_HOST, "/account", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("member@example.test"));

    // Backend now rejects the token
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/user/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_permissions(&server, &[]).await;

    let response = app
        .clone()
        .oneshot(get(CLUB_HOST, "/account", Some(&cookie)))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");

    assert!(!is_signed_in(&app, CLUB_HOST, &cookie).await);
}

#[tokio::test]
async fn test_unlisted_league_is_never_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/room_slug"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "slug": "osc" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/event/osc/leagues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "slug": "spring" }])))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(get(
            CLUB_HOST,
            "/leagues?league=..%2F..%2Froom%2Fadmin%2Fosc%2Factivity%3Fx%3D",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(paths, vec!["/web/room_slug", "/event/osc/leagues"]);
}

#[tokio::test]
async fn test_platform_endpoints_refused_on_club_site() {
    let server = MockServer::start().await;
    mount_profile(&server).await;
    mount_permissions(&server, &["GlobalManageRoomFees", "GlobalManageRooms"]).await;
    Mock::given(method("PUT"))
        .and(path("/web/admin/room-fees/osc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/room/admin/osc/ips/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    let app = app(&server);
    let cookie = sign_in(&app, CLUB_HOST).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            CLUB_HOST,
            "/api/admin/fees/osc",
            Some(&cookie),
            Some("[]"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(request(
            Method::DELETE,
            CLUB_HOST,
            "/api/admin/rooms/osc/ips/3",
            Some(&cookie),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_fee_editor_shows_readable_revenue_types() {
    let server = MockServer::start().await;
    mount_permissions(&server, &["GlobalManageRoomFees"]).await;
    Mock::given(method("POST"))
        .and(path("/room"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 2, "name": "Ottawa Snooker Club", "slug": "osc" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/web/admin/room-fees/osc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fees": [{
                "id": 1,
                "room_id": 2,
                "revenue_type": "STREAMING",
                "pricing_model": "FLAT",
                "flat_cents": 50
            }]
        })))
        .mount(&server)
        .await;
    let app = app(&server);
    let cookie = sign_in(&app, PLATFORM_HOST).await;

    let response = app
        .oneshot(get(PLATFORM_HOST, "/admin/fees?room=osc", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains(r#"<option value="STREAMING" selected>Streaming</option>"#));
    assert!(body.contains(r#"<option value="TABLE_TIME" selected>Table time</option>"#));
    assert!(body.contains(r#"<option value="FLAT" selected>Flat</option>"#));
    assert!(!body.contains(">TABLE_TIME<"));
}

#[tokio::test]
async fn test_landing_falls_back_to_default_hero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/public_content"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Ottawa Snooker Club",
            "slug": "osc",
            "tagline": "Cue up"
        })))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(get(CLUB_HOST, "/", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains(
        "background-image: url('https://assets.example.test/clubs/osc/hero.jpg?v=20240517'), \
         url('https://assets.example.test/clubs/defaults/hero.jpg')"
    ));
}
