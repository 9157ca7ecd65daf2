use axum::body::Body;
use axum::http::{Request, StatusCode};
use frontdesk::{create_router, AppState, Config};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> axum::Router {
    // No API key and no webhook: negotiation endpoints refuse, the
    // notifier skips dispatch, everything else works in memory.
    create_router(AppState::new(Config::default(), None))
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_check_works() {
    let app = app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn create_then_get_returns_active_session() {
    let app = app();

    let (status, body) = send(
        &app,
        post_json("/sessions", json!({"role": "visitor", "session_id": "s1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "s1");
    assert_eq!(body["status"], "connected");
    assert!(body["realtime_url"]
        .as_str()
        .unwrap()
        .starts_with("wss://"));

    let (status, body) = send(&app, get("/sessions/s1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["status"], "active");
    assert_eq!(body["session"]["transcript"], json!([]));
    // Realtime config is handed to the client alongside the snapshot.
    assert_eq!(body["config"]["turn_detection"]["type"], "server_vad");
    assert!(!body["config"]["instructions"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn create_generates_an_id_when_missing() {
    let app = app();
    let (status, body) = send(&app, post_json("/sessions", json!({"role": "visitor"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["session_id"].as_str().unwrap().starts_with("session-"));
}

#[tokio::test]
async fn invalid_role_is_rejected() {
    let app = app();

    let (status, body) = send(&app, post_json("/sessions", json!({"role": "ceo"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid role"));

    let (status, _) = send(&app, post_json("/sessions", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_session_id_conflicts() {
    let app = app();
    let req = json!({"role": "visitor", "session_id": "dup"});

    let (status, _) = send(&app, post_json("/sessions", req.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, post_json("/sessions", req)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = app();

    let (status, _) = send(&app, get("/sessions/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, delete("/sessions/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        post_json(
            "/sessions/ghost/turns",
            json!({"speaker": "user", "text": "やあ"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_turn_text_is_rejected() {
    let app = app();
    send(
        &app,
        post_json("/sessions", json!({"role": "visitor", "session_id": "s1"})),
    )
    .await;

    let (status, _) = send(
        &app,
        post_json("/sessions/s1/turns", json!({"speaker": "user", "text": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, get("/sessions/s1")).await;
    assert_eq!(body["session"]["transcript"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn duplicate_turn_within_window_is_not_recorded() {
    let app = app();
    send(
        &app,
        post_json("/sessions", json!({"role": "visitor", "session_id": "s1"})),
    )
    .await;

    let turn = json!({"speaker": "assistant", "text": "いらっしゃいませ"});
    let (status, body) = send(&app, post_json("/sessions/s1/turns", turn.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], true);

    let (status, body) = send(&app, post_json("/sessions/s1/turns", turn)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], false);

    let (_, body) = send(&app, get("/sessions/s1")).await;
    assert_eq!(body["session"]["transcript"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn full_session_scenario() {
    let app = app();

    send(
        &app,
        post_json("/sessions", json!({"role": "visitor", "session_id": "S1"})),
    )
    .await;

    let (status, body) = send(
        &app,
        post_json(
            "/sessions/S1/turns",
            json!({"speaker": "user", "text": "こんにちは"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], true);

    let (status, _) = send(
        &app,
        post_json(
            "/sessions/S1/turns",
            json!({"speaker": "assistant", "text": "いらっしゃいませ"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/sessions/S1")).await;
    let transcript = body["session"]["transcript"].as_array().unwrap().clone();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0]["speaker"], "user");
    assert_eq!(transcript[0]["text"], "こんにちは");
    assert_eq!(transcript[1]["speaker"], "assistant");
    assert_eq!(transcript[1]["text"], "いらっしゃいませ");

    let (status, body) = send(&app, delete("/sessions/S1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ended");
    assert_eq!(body["turns"], 2);

    // Gone after end completes; a second end is NotFound.
    let (status, _) = send(&app, get("/sessions/S1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, delete("/sessions/S1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_shows_active_sessions() {
    let app = app();
    send(
        &app,
        post_json("/sessions", json!({"role": "visitor", "session_id": "a"})),
    )
    .await;
    send(
        &app,
        post_json(
            "/sessions",
            json!({"role": "sales_rejection", "session_id": "b"}),
        ),
    )
    .await;

    let (status, body) = send(&app, get("/sessions")).await;
    assert_eq!(status, StatusCode::OK);
    let sessions = body.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|s| s["status"] == "active"));
}

#[tokio::test]
async fn negotiation_without_credentials_is_refused() {
    let app = app();

    let (status, body) = send(
        &app,
        post_json("/realtime/negotiate", json!({"sdp": "v=0"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("OPENAI_API_KEY"));

    let (status, _) = send(
        &app,
        post_json("/realtime/token", json!({"session_id": "s1"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn token_requires_a_session_id() {
    let app = app();

    let (status, body) = send(&app, post_json("/realtime/token", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("session_id"));

    let (status, _) = send(
        &app,
        post_json("/realtime/token", json!({"session_id": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn negotiation_requires_an_offer() {
    let app = app();
    let (status, body) = send(&app, post_json("/realtime/negotiate", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("sdp"));
}
