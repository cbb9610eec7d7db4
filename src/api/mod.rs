// API module - HTTP endpoints

pub mod admin;
pub mod auth;
pub mod health;
pub mod layout;
pub mod middleware;
pub mod public;
pub mod refresh;

use std::path::Path;

use axum::{
    body::Body,
    http::Request,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::get_service,
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::Span;

use crate::api::middleware::auth::expire_rejected_session;
use crate::api::middleware::session::{create_session_layer, AppState};
use crate::api::middleware::site::Site;
use crate::error::AppError;

/// Directory of the static assets served under `/static`.
pub const STATIC_DIR: &str = "static";

/// The whole application: pages, auth flow, admin JSON API and static assets.
pub fn router(state: AppState) -> Router {
    let session_layer = create_session_layer(&state.config);

    let static_routes = Router::new().nest_service(
        "/static",
        get_service(ServeDir::new(Path::new(STATIC_DIR))),
    );

    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(refresh::router())
        .merge(public::router())
        .merge(admin::router())
        .fallback(not_found)
        .layer(from_fn(expire_rejected_session))
        .layer(session_layer)
        .merge(static_routes)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

async fn not_found(site: Site) -> Response {
    if site.is_auth() {
        return auth::unknown_auth_route();
    }
    AppError::NotFound("Page not found".to_string()).into_response()
}

/// Span for one request. Query strings carry login handoffs and OAuth codes,
/// so only the path is recorded.
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_request_span_omits_query() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let request = Request::builder()
            .uri("/login/finish?handoff=sealed-tokens&code=abc")
            .body(Body::empty())
            .unwrap();

        tracing::subscriber::with_default(subscriber, || {
            let span = request_span(&request);
            let _entered = span.enter();
            tracing::info!("finished processing request");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("path=/login/finish"), "{}", output);
        assert!(output.contains("method=GET"), "{}", output);
        assert!(!output.contains("sealed-tokens"), "{}", output);
        assert!(!output.contains("code=abc"), "{}", output);
    }
}
