//! Integration tests for the wrms HTTP API
//!
//! Drives the router in-process with `oneshot`, backed by the dummy backend.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;
use wrms_server::api::{create_router, AppState};
use wrms_server::backend::dummy::DummyBackend;
use wrms_server::backend::{Backends, PlayerCommand};
use wrms_server::scheduler::Scheduler;

/// Test helper: app over the dummy catalog, plus the player command receiver
fn setup_app() -> (Router, tokio::sync::mpsc::UnboundedReceiver<PlayerCommand>) {
    let (scheduler, commands) = Scheduler::new(64);
    let mut backends = Backends::new();
    backends.push(Box::new(DummyBackend::new(None)));

    let app = create_router(AppState {
        scheduler,
        backends: Arc::new(backends),
        static_dir: None,
    });
    (app, commands)
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn vote_request(uri: &str, voter: Uuid) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, format!("theme=dark; UUID={}", voter))
        .body(Body::empty())
        .unwrap()
}

fn add_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/add")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn add(app: &Router, uri: &str) {
    let response = app
        .clone()
        .oneshot(add_request(json!({"title": uri, "artist": "Kiesel", "source": "dummy", "uri": uri})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Health / Search
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _commands) = setup_app();
    let response = app.oneshot(request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "wrms");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_root_redirects_to_static_index() {
    let (app, _commands) = setup_app();
    let response = app.oneshot(request("GET", "/")).await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/static/index.html");
}

#[tokio::test]
async fn test_search_returns_search_event() {
    let (app, _commands) = setup_app();
    let response = app
        .oneshot(request("GET", "/search?pattern=hobel"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["cmd"], "search");
    assert_eq!(body["songs"].as_array().unwrap().len(), 1);
    assert_eq!(body["songs"][0]["title"], "Hobelbank");
    assert_eq!(body["songs"][0]["artist"], "MC Wankwichtel");
    assert_eq!(body["songs"][0]["weight"], 0);
}

// =============================================================================
// Add
// =============================================================================

#[tokio::test]
async fn test_add_resets_weight_and_queues() {
    let (app, _commands) = setup_app();
    let response = app
        .clone()
        .oneshot(add_request(json!({"title": "Lala", "artist": "SNFMT", "uri": "dummy:lala", "weight": 42})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["weight"], 0);

    let response = app.oneshot(request("GET", "/queue")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["songs"][0]["uri"], "dummy:lala");
    assert_eq!(body["playing"], false);
    assert!(body["current"].is_null());
}

#[tokio::test]
async fn test_add_malformed_body_is_400() {
    let (app, _commands) = setup_app();

    for body in ["not json", r#"{"title": "no uri"}"#, r#"{"title":"x","artist":"y","uri":""}"#] {
        let request = Request::builder()
            .method("POST")
            .uri("/add")
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);

        let json = extract_json(response.into_body()).await;
        assert_eq!(json["error"]["code"], "MALFORMED_INPUT");
    }
}

// =============================================================================
// Votes
// =============================================================================

#[tokio::test]
async fn test_vote_without_cookie_is_401() {
    let (app, _commands) = setup_app();
    add(&app, "dummy:lala").await;

    let response = app
        .oneshot(request("GET", "/up?song=dummy:lala"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"]["code"], "MISSING_VOTER_ID");
}

#[tokio::test]
async fn test_vote_with_invalid_cookie_is_400() {
    let (app, _commands) = setup_app();
    add(&app, "dummy:lala").await;

    let request = Request::builder()
        .uri("/up?song=dummy:lala")
        .header(header::COOKIE, "UUID=not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vote_unknown_song_is_404() {
    let (app, _commands) = setup_app();
    let response = app
        .oneshot(vote_request("/up?song=dummy:nothing", Uuid::new_v4()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"]["code"], "UNKNOWN_SONG");
}

#[tokio::test]
async fn test_vote_missing_song_param_is_400() {
    let (app, _commands) = setup_app();
    let response = app
        .oneshot(vote_request("/down", Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vote_sequence_and_rejection() {
    let (app, _commands) = setup_app();
    let voter = Uuid::new_v4();
    add(&app, "dummy:lala").await;

    let response = app
        .clone()
        .oneshot(vote_request("/up?song=dummy:lala", voter))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["vote"], "upvoted");
    assert_eq!(json["song"]["weight"], 1);

    // Second upvote by the same voter is a no-op, reported as rejected
    let response = app
        .clone()
        .oneshot(vote_request("/up?song=dummy:lala", voter))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["status"], "rejected");
    assert_eq!(json["song"]["weight"], 1);

    // Flip to a downvote: net -1
    let request = Request::builder()
        .method("POST")
        .uri("/down?song=dummy:lala")
        .header(header::COOKIE, format!("UUID={}", voter))
        .body(Body::empty())
        .unwrap();
    let json = extract_json(app.clone().oneshot(request).await.unwrap().into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["song"]["weight"], -1);

    let json = extract_json(
        app.clone()
            .oneshot(vote_request("/unvote?song=dummy:lala", voter))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(json["vote"], "neutral");
    assert_eq!(json["song"]["weight"], 0);

    let json = extract_json(
        app.oneshot(vote_request("/unvote?song=dummy:lala", voter))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(json["status"], "rejected");
}

// =============================================================================
// Playback
// =============================================================================

#[tokio::test]
async fn test_playpause_with_empty_queue_is_idle() {
    let (app, mut commands) = setup_app();
    let response = app.oneshot(request("GET", "/playpause")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["status"], "idle");
    assert!(commands.try_recv().is_err());
}

#[tokio::test]
async fn test_playback_follows_weights() {
    let (app, mut commands) = setup_app();
    add(&app, "dummy:a").await;
    add(&app, "dummy:b").await;
    app.clone()
        .oneshot(vote_request("/up?song=dummy:b", Uuid::new_v4()))
        .await
        .unwrap();

    let json = extract_json(app.clone().oneshot(request("POST", "/playpause")).await.unwrap().into_body()).await;
    assert_eq!(json["status"], "playing");
    assert_eq!(json["song"]["uri"], "dummy:b");
    assert!(matches!(commands.try_recv(), Ok(PlayerCommand::Play(s)) if s.uri == "dummy:b"));

    let json = extract_json(app.clone().oneshot(request("POST", "/pause")).await.unwrap().into_body()).await;
    assert_eq!(json["status"], "paused");
    assert!(matches!(commands.try_recv(), Ok(PlayerCommand::Pause)));

    let json = extract_json(app.clone().oneshot(request("POST", "/play")).await.unwrap().into_body()).await;
    assert_eq!(json["status"], "playing");
    assert_eq!(json["song"]["uri"], "dummy:b");

    let json = extract_json(app.clone().oneshot(request("POST", "/next")).await.unwrap().into_body()).await;
    assert_eq!(json["status"], "playing");
    assert_eq!(json["song"]["uri"], "dummy:a");

    let json = extract_json(app.clone().oneshot(request("POST", "/next")).await.unwrap().into_body()).await;
    assert_eq!(json["status"], "idle");

    let json = extract_json(app.oneshot(request("GET", "/queue")).await.unwrap().into_body()).await;
    assert!(json["current"].is_null());
    assert_eq!(json["songs"].as_array().unwrap().len(), 0);
}

// =============================================================================
// Observer transports
// =============================================================================

#[tokio::test]
async fn test_event_stream_starts_with_replay() {
    let (app, _commands) = setup_app();
    add(&app, "dummy:lala").await;

    let response = app.oneshot(request("GET", "/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("replay should arrive")
        .expect("stream should not end")
        .expect("frame should be readable");
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();

    assert!(text.contains("event: add"), "got {:?}", text);
    assert!(text.contains("dummy:lala"));
}
