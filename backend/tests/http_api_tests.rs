//! Request-level tests for the HTTP API.

#![cfg(feature = "http-server")]

mod support;

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use incident_review::db::repositories::LocalRepository;
use incident_review::db::IncidentRepository;
use incident_review::http::{create_router, AppState};
use incident_review::models::{IncidentEvent, ResultShape};
use incident_review::services::{FixedClock, QuerySettings, SessionStore};
use support::{query_file, reference_now, RANGE_QUERY};

struct TestApp {
    router: Router,
    repo: Arc<LocalRepository>,
    clock: Arc<FixedClock>,
    sessions: SessionStore,
    _dir: TempDir,
}

fn app_with(query_path: Option<PathBuf>) -> TestApp {
    let (dir, path) = query_file(RANGE_QUERY);
    let now = reference_now();
    let repo = Arc::new(LocalRepository::with_events(vec![
        IncidentEvent::reviewed(now - Duration::minutes(5), "alice"),
        IncidentEvent::reviewed(now - Duration::minutes(15), "alice"),
        IncidentEvent::reviewed(now - Duration::minutes(25), "bob"),
        IncidentEvent::needs_review(now - Duration::minutes(35)),
    ]));
    let clock = Arc::new(FixedClock::new(now));
    let sessions = SessionStore::with_clock(clock.clone()).with_capacity(4);

    let state = AppState::new(repo.clone() as Arc<dyn IncidentRepository>)
        .with_sessions(sessions.clone())
        .with_query_settings(QuerySettings {
            query_file: query_path.unwrap_or(path),
            result_shape: ResultShape::Report,
        });

    TestApp {
        router: create_router(state),
        repo,
        clock,
        sessions,
        _dir: dir,
    }
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let app = app_with(None);
    let (status, body) = send(&app.router, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["backend"], "local");

    app.repo.set_healthy(false);
    let (_, body) = send(&app.router, "GET", "/health").await;
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_list_timeframes() {
    let app = app_with(None);
    let (status, body) = send(&app.router, "GET", "/v1/timeframes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default"], "24h");
    assert_eq!(body["options"].as_array().unwrap().len(), 5);
    assert_eq!(body["options"][0]["label"], "1 Hour");
    assert_eq!(body["options"][4]["interval"], "90 days");
}

#[tokio::test]
async fn test_dashboard_ready() {
    let app = app_with(None);
    let (status, body) = send(&app.router, "GET", "/v1/dashboard?timeframe=1h").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "ready");
    assert_eq!(body["message"], Value::Null);
    assert_eq!(body["selection"]["preset"], "1h");
    assert_eq!(body["window_basis"], "anchor");
    assert_eq!(body["pills"][0]["value"], 3);
    assert_eq!(body["pills"][1]["value"], 1);
    assert_eq!(body["donut"]["center_value"], "4");
    assert_eq!(body["leaderboard"]["rows"][0]["annotator"], "alice");
    assert_eq!(body["leaderboard"]["rows"][0]["count"], 2);
    assert_eq!(body["leaderboard"]["bars"]["categories"][1], "bob");
}

#[tokio::test]
async fn test_dashboard_accepts_preset_label() {
    let app = app_with(None);
    let (status, body) = send(&app.router, "GET", "/v1/dashboard?timeframe=7%20Days").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selection"]["preset"], "7d");
}

#[tokio::test]
async fn test_dashboard_empty_custom_range() {
    let app = app_with(None);
    let (status, body) = send(
        &app.router,
        "GET",
        "/v1/dashboard?start_date=2024-01-01&end_date=2024-01-02",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "empty");
    assert_eq!(
        body["message"],
        "No incidents found between 2024-01-01 00:00:00 and 2024-01-02 23:59:59."
    );
    assert_eq!(body["donut"], Value::Null);
}

#[tokio::test]
async fn test_dashboard_reversed_range_is_bad_request() {
    let app = app_with(None);
    let (status, body) = send(
        &app.router,
        "GET",
        "/v1/dashboard?start=2024-06-02T00:00:00Z&end=2024-06-01T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_RANGE");
    assert!(app.repo.executed_queries().is_empty());
}

#[tokio::test]
async fn test_dashboard_unknown_timeframe() {
    let app = app_with(None);
    let (status, body) = send(&app.router, "GET", "/v1/dashboard?timeframe=2w").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_dashboard_database_unavailable() {
    let app = app_with(None);
    app.repo.set_healthy(false);
    let (status, body) = send(&app.router, "GET", "/v1/dashboard").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "CONNECTION_ERROR");
}

#[tokio::test]
async fn test_dashboard_missing_query_file() {
    let app = app_with(Some(PathBuf::from("/nonexistent/review-check.sql")));
    let (status, body) = send(&app.router, "GET", "/v1/dashboard").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "RESOURCE_NOT_FOUND");
    assert_eq!(
        body["message"],
        "Error: 'review-check.sql' file not found in the directory."
    );
}

#[tokio::test]
async fn test_session_anchor_holds_until_refresh() {
    let app = app_with(None);

    let (status, session) = send(&app.router, "POST", "/v1/sessions").await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = session["session_id"].as_str().unwrap().to_string();

    // An incident arrives after the session was opened.
    app.clock.advance(Duration::minutes(30));
    app.repo
        .add_event(IncidentEvent::reviewed(reference_now() + Duration::minutes(10), "carol"));

    let uri = format!("/v1/dashboard?timeframe=1h&session={}", session_id);
    let (_, body) = send(&app.router, "GET", &uri).await;
    assert_eq!(body["pills"][0]["value"], 3);
    let anchored: DateTime<Utc> = serde_json::from_value(body["reference_now"].clone()).unwrap();
    assert_eq!(anchored, reference_now());

    let (status, refreshed) = send(
        &app.router,
        "POST",
        &format!("/v1/sessions/{}/refresh", session_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["refresh_count"], 1);

    let (_, body) = send(&app.router, "GET", &uri).await;
    let anchored: DateTime<Utc> = serde_json::from_value(body["reference_now"].clone()).unwrap();
    assert_eq!(anchored, reference_now() + Duration::minutes(30));
    // alice@-5m, alice@-15m, bob@-25m and carol@+10m fall inside the hour
    // ending at +30m; the needs-review incident at -35m does not.
    assert_eq!(body["pills"][0]["value"], 4);
    assert_eq!(body["pills"][1]["value"], 0);
}

#[tokio::test]
async fn test_session_header_is_honored() {
    let app = app_with(None);
    let request = Request::builder()
        .uri("/v1/dashboard")
        .header("x-session-id", "tab-1")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, refreshed) = send(&app.router, "POST", "/v1/sessions/tab-1/refresh").await;
    assert_eq!(refreshed["session_id"], "tab-1");
    assert_eq!(refreshed["refresh_count"], 1);
}

#[tokio::test]
async fn test_rejected_requests_do_not_open_sessions() {
    let app = app_with(None);

    let (status, _) = send(&app.router, "GET", "/v1/dashboard?timeframe=2w&session=a").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(
        &app.router,
        "GET",
        "/v1/dashboard?start=2024-06-02T00:00:00Z&end=2024-06-01T00:00:00Z&session=b",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_client_chosen_session_ids_stay_bounded() {
    let app = app_with(None);
    for i in 0..20 {
        let uri = format!("/v1/dashboard?session=tab-{}", i);
        let (status, _) = send(&app.router, "GET", &uri).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(app.sessions.len(), 4);
}
