//! HTTP surface: on-demand polls, session inspection and the cron trigger.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::app::App;
use crate::scheduler;

/// Header carrying the shared secret for protected routes.
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

#[derive(Clone)]
struct ServerState {
    app: App,
    cron_secret: Option<Arc<str>>,
}

/// Response body shared by every route except `/healthz`.
#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: DateTime<Utc>,
}

fn ok<T: Serialize>(data: T) -> Response {
    let body = Envelope {
        success: true,
        data: Some(data),
        error: None,
        timestamp: Utc::now(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn failure(status: StatusCode, error: impl ToString) -> Response {
    let body = Envelope::<()> {
        success: false,
        data: None,
        error: Some(error.to_string()),
        timestamp: Utc::now(),
    };
    (status, Json(body)).into_response()
}

/// Build the router. Protected routes exist only when `cron_secret` is set.
pub fn router(app: App, cron_secret: Option<String>) -> Router {
    let state = ServerState {
        app,
        cron_secret: cron_secret.filter(|s| !s.is_empty()).map(Arc::from),
    };

    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route("/credits", get(credits))
        .route("/credits/latest", get(latest_credit))
        .route("/templates", get(templates))
        .route("/session", get(session_status));

    if state.cron_secret.is_some() {
        router = router
            .route("/api/cron-check", get(cron_check))
            .route("/session/refresh", post(refresh_session));
    } else {
        warn!("No cron secret configured, protected routes are disabled");
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}

/// Serve `app` on `addr` until interrupted.
pub async fn serve(app: App, addr: SocketAddr, cron_secret: Option<String>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "credwatch listening");

    axum::serve(listener, router(app, cron_secret))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server exited with error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutting down");
}

fn authorize(state: &ServerState, headers: &HeaderMap) -> std::result::Result<(), Response> {
    let given = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match (&state.cron_secret, given) {
        (Some(expected), Some(given)) if secrets_match(expected.as_bytes(), given.as_bytes()) => {
            Ok(())
        }
        _ => {
            warn!("Rejected request without a valid cron secret");
            Err(failure(StatusCode::UNAUTHORIZED, "Unauthorized cron request"))
        }
    }
}

/// Compare without short-circuiting on the first differing byte.
fn secrets_match(expected: &[u8], given: &[u8]) -> bool {
    expected.len() == given.len()
        && expected
            .iter()
            .zip(given)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn credits(State(state): State<ServerState>) -> Response {
    match state.app.pipeline.poll_credits().await {
        Ok(report) => ok(json!({
            "credits": report.reading.credits,
            "alerted": report.alerted,
        })),
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "On-demand credits check failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn latest_credit(State(state): State<ServerState>) -> Response {
    match state.app.credits.latest() {
        Some(reading) => ok(reading),
        None => failure(StatusCode::NOT_FOUND, "No credit reading recorded yet"),
    }
}

async fn templates(State(state): State<ServerState>) -> Response {
    match state.app.pipeline.poll_templates().await {
        Ok(report) => ok(json!({
            "totalCount": report.templates.len(),
            "templates": report.templates,
            "recentDisabled": report.recent_disabled,
        })),
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "On-demand templates check failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn session_status(State(state): State<ServerState>) -> Response {
    ok(state.app.session().status())
}

async fn cron_check(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    info!("Running cycle for cron trigger");
    let cycle = scheduler::run_cycle(&state.app.pipeline).await;
    match (cycle.credits, cycle.templates) {
        (Ok(credits), Ok(templates)) => ok(json!({
            "credits": credits.reading.credits,
            "alerted": credits.alerted,
            "templates": {
                "totalCount": templates.templates.len(),
                "recentDisabled": templates.recent_disabled.len(),
            },
        })),
        (credits, templates) => {
            let errors: Vec<String> = [
                credits.err().map(|e| format!("credits: {e}")),
                templates.err().map(|e| format!("templates: {e}")),
            ]
            .into_iter()
            .flatten()
            .collect();
            failure(StatusCode::INTERNAL_SERVER_ERROR, errors.join("; "))
        }
    }
}

async fn refresh_session(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    match state.app.session().refresh().await {
        Ok(_) => ok(state.app.session().status()),
        Err(e) => {
            warn!(error = %e, "Forced refresh failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::testing::{CountingLogins, FakeBackend, app};

    const SECRET: &str = "s3cret";

    fn healthy_backend() -> Arc<FakeBackend> {
        FakeBackend::new(
            json!({ "templateCredit": 100 }),
            json!({ "templates": [{
                "name": "promo",
                "status": "APPROVED",
                "updatedAt": "2026-01-01T00:00:00Z"
            }] }),
        )
    }

    fn test_router(backend: Arc<FakeBackend>, secret: Option<&str>) -> (Router, Arc<CountingLogins>) {
        let (app, logins) = app(backend);
        (router(app, secret.map(str::to_string)), logins)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn with_secret(method: &str, uri: &str, secret: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CRON_SECRET_HEADER, secret)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (router, _) = test_router(healthy_backend(), None);
        let (status, body) = send(&router, get("/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn credits_polls_and_caches() {
        let (router, _) = test_router(healthy_backend(), None);

        let (status, body) = send(&router, get("/credits/latest")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, body) = send(&router, get("/credits")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["credits"], 100.0);
        assert_eq!(body["data"]["alerted"], true);
        assert!(body["timestamp"].is_string());

        let (status, body) = send(&router, get("/credits/latest")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["credits"], 100.0);
    }

    #[tokio::test]
    async fn templates_returns_normalized_list() {
        let (router, _) = test_router(healthy_backend(), None);

        let (status, body) = send(&router, get("/templates")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["totalCount"], 1);
        assert_eq!(body["data"]["templates"][0]["name"], "promo");
        assert_eq!(body["data"]["templates"][0]["status"], "approved");
        assert_eq!(body["data"]["recentDisabled"], json!([]));
    }

    #[tokio::test]
    async fn pipeline_errors_become_failure_envelopes() {
        let backend = FakeBackend::new(json!({ "unexpected": 1 }), json!({}));
        let (router, _) = test_router(backend, None);

        let (status, body) = send(&router, get("/credits")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("templateCredit"));
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn cron_check_requires_the_secret() {
        let (router, logins) = test_router(healthy_backend(), Some(SECRET));

        let (status, _) = send(&router, get("/api/cron-check")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&router, with_secret("GET", "/api/cron-check", "wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized cron request");
        assert_eq!(logins.count(), 0);

        let (status, body) = send(&router, with_secret("GET", "/api/cron-check", SECRET)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["credits"], 100.0);
        assert_eq!(body["data"]["templates"]["totalCount"], 1);
        assert_eq!(logins.count(), 1);
    }

    #[tokio::test]
    async fn protected_routes_are_absent_without_a_secret() {
        let (router, _) = test_router(healthy_backend(), None);
        let response = router
            .oneshot(with_secret("GET", "/api/cron-check", SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn session_can_be_inspected_and_refreshed() {
        let (router, logins) = test_router(healthy_backend(), Some(SECRET));

        let (_, body) = send(&router, get("/session")).await;
        assert_eq!(body["data"]["state"], "unauthenticated");
        assert_eq!(body["data"]["valid"], false);

        let (status, _) = send(&router, with_secret("POST", "/session/refresh", "nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&router, with_secret("POST", "/session/refresh", SECRET)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], "authenticated");
        assert!(body["data"]["expiresAt"].is_string());
        assert_eq!(logins.count(), 1);
    }

    #[test]
    fn secret_comparison_requires_exact_match() {
        assert!(secrets_match(b"abc", b"abc"));
        assert!(!secrets_match(b"abc", b"abd"));
        assert!(!secrets_match(b"abc", b"abcd"));
    }
}
