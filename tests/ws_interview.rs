//! Integration tests for the interview WebSocket + REST system.
//!
//! Each test spins up an Axum server on a random port, connects via
//! tokio-tungstenite, and exercises the real WS / REST contract.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use career_intake::auth::{Authenticator, JwtAuthenticator, auth_routes, hash_password};
use career_intake::catalog::{Catalog, CatalogModule, QuestionKind};
use career_intake::interview::ws::{AppState, interview_routes};
use career_intake::recommend::{RecommendationOutcome, RecommendationProvider};
use career_intake::store::{LibSqlBackend, SessionStore};

use career_intake::error::RecommendationError;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const TEST_SECRET: &str = "integration-test-secret";

/// Stub provider for integration tests (no real recommender calls).
struct StubRecommender;

#[async_trait]
impl RecommendationProvider for StubRecommender {
    async fn produce(
        &self,
        _answers: &HashMap<String, String>,
    ) -> Result<RecommendationOutcome, RecommendationError> {
        Ok(RecommendationOutcome {
            consultation: Some("Consider backend roles.".to_string()),
            hh_ids: vec!["42".to_string()],
            recommendations: vec![serde_json::json!({"name": "Backend Developer"})],
        })
    }
}

/// Three-question catalog so tests stay short: a select, a short
/// string, and a bounded number.
fn scenario_catalog() -> Catalog {
    Catalog::from_modules(vec![CatalogModule {
        key: "scenario",
        title: "Scenario",
        questions: vec![
            (
                "field",
                "Which field do you work in?",
                QuestionKind::Select {
                    options: vec!["IT".to_string(), "Finance".to_string()],
                },
            ),
            (
                "position",
                "What is your current position?",
                QuestionKind::Line { max_length: 50 },
            ),
            (
                "years",
                "How many years of experience do you have?",
                QuestionKind::Number { min: 0, max: 50 },
            ),
        ],
    }])
}

/// Start an Axum server on a random port. Returns the port, the store
/// and the JWT issuer, so tests can mint tokens and inspect state.
async fn start_server(
    recommender: Option<Arc<dyn RecommendationProvider>>,
) -> (u16, Arc<dyn SessionStore>, Arc<JwtAuthenticator>) {
    let store: Arc<dyn SessionStore> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let jwt = Arc::new(JwtAuthenticator::new(SecretString::from(TEST_SECRET), 30));
    let authenticator: Arc<dyn Authenticator> = jwt.clone();

    let state = AppState {
        catalog: Arc::new(scenario_catalog()),
        store: Arc::clone(&store),
        authenticator,
        recommender,
    };
    let app = interview_routes(state).merge(auth_routes(Arc::clone(&store), jwt.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, store, jwt)
}

/// Create a user directly in the store and mint a token for them.
async fn make_user(store: &Arc<dyn SessionStore>, jwt: &JwtAuthenticator) -> (Uuid, String) {
    let hash = hash_password("hunter22").unwrap();
    let user = store
        .create_user(&format!("user-{}", Uuid::new_v4()), "u@example.com", &hash)
        .await
        .unwrap();
    let token = jwt.issue(user.id).unwrap();
    (user.id, token)
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(port: u16, token: &str) -> WsStream {
    let (ws, _resp) = connect_async(format!("ws://127.0.0.1:{port}/ws?token={token}"))
        .await
        .expect("WS connect failed");
    ws
}

/// Parse a WS text frame into a serde_json::Value.
fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {other:?}"),
    }
}

/// Read the next text frame from the socket as JSON.
async fn next_json(ws: &mut WsStream) -> Value {
    let msg = ws.next().await.unwrap().unwrap();
    parse_ws_json(&msg)
}

async fn send_text(ws: &mut WsStream, text: &str) {
    ws.send(Message::Text(text.into())).await.unwrap();
}

// ── WebSocket Tests ──────────────────────────────────────────────────

#[tokio::test]
async fn ws_rejects_invalid_token_with_policy_close() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store, _jwt) = start_server(None).await;

        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws?token=garbage"))
            .await
            .expect("upgrade should succeed before auth check");

        let msg = ws.next().await.unwrap().unwrap();
        match msg {
            Message::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), 1008);
                assert_eq!(frame.reason, "authentication failed");
            }
            other => panic!("expected Close frame, got {other:?}"),
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_connect_asks_first_question() {
    timeout(TEST_TIMEOUT, async {
        let (port, store, jwt) = start_server(None).await;
        let (_user_id, token) = make_user(&store, &jwt).await;

        let mut ws = connect(port, &token).await;
        let json = next_json(&mut ws).await;

        assert_eq!(json["prompt"], "Which field do you work in?");
        assert_eq!(json["type"], "select");
        assert_eq!(json["options"], serde_json::json!(["IT", "Finance"]));
        assert_eq!(json["progress"]["current"], 1);
        assert_eq!(json["progress"]["total"], 3);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_invalid_answer_yields_error_then_reprompt() {
    timeout(TEST_TIMEOUT, async {
        let (port, store, jwt) = start_server(None).await;
        let (_user_id, token) = make_user(&store, &jwt).await;

        let mut ws = connect(port, &token).await;
        let _q1 = next_json(&mut ws).await;

        send_text(&mut ws, "Retail").await;
        let err = next_json(&mut ws).await;
        assert_eq!(err["error"]["code"], "validation_failed");
        assert!(
            err["error"]["message"]
                .as_str()
                .unwrap()
                .contains("Please choose one of")
        );

        // The same question is asked again, progress unchanged.
        let q1_again = next_json(&mut ws).await;
        assert_eq!(q1_again["prompt"], "Which field do you work in?");
        assert_eq!(q1_again["progress"]["current"], 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_duplicate_answer_yields_duplicate_frame() {
    timeout(TEST_TIMEOUT, async {
        let (port, store, jwt) = start_server(None).await;
        let (_user_id, token) = make_user(&store, &jwt).await;

        let mut ws = connect(port, &token).await;
        let _q1 = next_json(&mut ws).await;
        send_text(&mut ws, "IT").await;
        let _q2 = next_json(&mut ws).await;

        // Same answer as the previous accepted one, modulo case.
        send_text(&mut ws, "it").await;
        let dup = next_json(&mut ws).await;
        assert_eq!(dup, serde_json::json!({"error": "duplicate"}));

        // Still on question two afterwards.
        let q2_again = next_json(&mut ws).await;
        assert_eq!(q2_again["progress"]["current"], 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_full_interview_reaches_finished() {
    timeout(TEST_TIMEOUT, async {
        let (port, store, jwt) = start_server(None).await;
        let (user_id, token) = make_user(&store, &jwt).await;

        let mut ws = connect(port, &token).await;

        let q1 = next_json(&mut ws).await;
        assert_eq!(q1["progress"]["current"], 1);
        send_text(&mut ws, "IT").await;

        let q2 = next_json(&mut ws).await;
        assert_eq!(q2["progress"]["current"], 2);
        send_text(&mut ws, "Backend developer").await;

        let q3 = next_json(&mut ws).await;
        assert_eq!(q3["progress"]["current"], 3);
        send_text(&mut ws, "5").await;

        // No recommender configured: straight to the finished frame.
        let finished = next_json(&mut ws).await;
        assert_eq!(finished, serde_json::json!({"event": "finished"}));

        // Server closes normally after completion.
        let msg = ws.next().await.unwrap().unwrap();
        match msg {
            Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1000),
            other => panic!("expected Close frame, got {other:?}"),
        }

        // All three answers landed in the session.
        let session = store.get_latest_session(user_id).await.unwrap().unwrap();
        assert_eq!(session.answers_count, 3);
        assert_eq!(session.collected_data.get("field").unwrap(), "IT");
        assert_eq!(session.collected_data.get("years").unwrap(), "5");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_reconnect_replays_history_and_resumes() {
    timeout(TEST_TIMEOUT, async {
        let (port, store, jwt) = start_server(None).await;
        let (user_id, token) = make_user(&store, &jwt).await;

        // First connection: answer one question, then drop the socket.
        let mut ws = connect(port, &token).await;
        let _q1 = next_json(&mut ws).await;
        send_text(&mut ws, "IT").await;
        let _q2 = next_json(&mut ws).await;
        drop(ws);

        // Give the server time to observe the disconnect.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let first = store.get_latest_session(user_id).await.unwrap().unwrap();
        assert_eq!(first.answers_count, 1);

        // Second connection: two history frames, then question two.
        let mut ws = connect(port, &token).await;

        let h1 = next_json(&mut ws).await;
        assert_eq!(h1["role"], "bot");
        assert_eq!(h1["content"], "Which field do you work in?");

        let h2 = next_json(&mut ws).await;
        assert_eq!(h2["role"], "user");
        assert_eq!(h2["content"], "IT");

        let q2 = next_json(&mut ws).await;
        assert_eq!(q2["prompt"], "What is your current position?");
        assert_eq!(q2["progress"]["current"], 2);

        // Same session, not a fresh one.
        let resumed = store.get_latest_session(user_id).await.unwrap().unwrap();
        assert_eq!(resumed.id, first.id);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_completion_emits_recommendation_frames_in_order() {
    timeout(TEST_TIMEOUT, async {
        let (port, store, jwt) = start_server(Some(Arc::new(StubRecommender))).await;
        let (_user_id, token) = make_user(&store, &jwt).await;

        let mut ws = connect(port, &token).await;
        let _q1 = next_json(&mut ws).await;
        send_text(&mut ws, "IT").await;
        let _q2 = next_json(&mut ws).await;
        send_text(&mut ws, "Backend developer").await;
        let _q3 = next_json(&mut ws).await;
        send_text(&mut ws, "5").await;

        let consultation = next_json(&mut ws).await;
        assert_eq!(consultation["event"], "career_consultation");
        assert_eq!(consultation["data"]["consultation"], "Consider backend roles.");

        let recs = next_json(&mut ws).await;
        assert_eq!(recs["event"], "recommendations");
        assert_eq!(recs["data"]["hh_ids"], serde_json::json!(["42"]));
        assert_eq!(recs["data"]["recommendations"][0]["name"], "Backend Developer");

        let finished = next_json(&mut ws).await;
        assert_eq!(finished, serde_json::json!({"event": "finished"}));
    })
    .await
    .expect("test timed out");
}

// ── REST Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn rest_health_reports_ok() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store, _jwt) = start_server(None).await;

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "career-intake");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_register_login_and_start_session() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store, _jwt) = start_server(None).await;
        let client = reqwest::Client::new();
        let base = format!("http://127.0.0.1:{port}");

        // Register.
        let resp = client
            .post(format!("{base}/api/auth/register"))
            .json(&serde_json::json!({
                "login": "alice",
                "email": "alice@example.com",
                "password": "hunter22",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);

        // Same login again is a conflict.
        let resp = client
            .post(format!("{base}/api/auth/register"))
            .json(&serde_json::json!({
                "login": "alice",
                "email": "other@example.com",
                "password": "hunter22",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);

        // Wrong password is rejected.
        let resp = client
            .post(format!("{base}/api/auth/login"))
            .json(&serde_json::json!({"login": "alice", "password": "wrong"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);

        // Correct credentials yield a usable bearer token.
        let resp = client
            .post(format!("{base}/api/auth/login"))
            .json(&serde_json::json!({"login": "alice", "password": "hunter22"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().unwrap().to_string();

        let resp = client
            .post(format!("{base}/api/sessions"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["question"], "Which field do you work in?");
        let session_id = body["session_id"].as_str().unwrap().to_string();

        // Starting again reuses the active session.
        let resp = client
            .post(format!("{base}/api/sessions"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["session_id"], session_id);

        // Message history is owner-scoped and initially empty.
        let resp = client
            .get(format!("{base}/api/sessions/{session_id}/messages"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert!(body.as_array().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_session_endpoints_require_auth() {
    timeout(TEST_TIMEOUT, async {
        let (port, store, jwt) = start_server(None).await;
        let client = reqwest::Client::new();
        let base = format!("http://127.0.0.1:{port}");

        let resp = client
            .post(format!("{base}/api/sessions"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);

        // A valid token cannot read someone else's session.
        let (owner_id, _owner_token) = make_user(&store, &jwt).await;
        let session = store.create_session(owner_id).await.unwrap();
        let (_other_id, other_token) = make_user(&store, &jwt).await;

        let resp = client
            .get(format!("{base}/api/sessions/{}/messages", session.id))
            .bearer_auth(&other_token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);

        let resp = client
            .get(format!("{base}/api/sessions/not-a-uuid/messages"))
            .bearer_auth(&other_token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    })
    .await
    .expect("test timed out");
}
