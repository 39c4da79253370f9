//! HTTP API tests driven through the router with `oneshot`

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use spanish_tutor::api::{router, AppState};
use spanish_tutor::config::AppConfig;
use spanish_tutor::llm::{GenerationRequest, ProviderError, ProviderKind, ReplyGenerator};
use spanish_tutor::models::NewSession;
use spanish_tutor::{Database, SessionMode, SqliteTutorRepository, TutorRepository};

enum Behavior {
    Reply(&'static str),
    RateLimited,
}

struct FixedGenerator(Behavior);

#[async_trait]
impl ReplyGenerator for FixedGenerator {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, ProviderError> {
        match self.0 {
            Behavior::Reply(text) => Ok(text.to_string()),
            Behavior::RateLimited => Err(ProviderError::RateLimited {
                provider: ProviderKind::Gemini,
                message: "RESOURCE_EXHAUSTED".to_string(),
            }),
        }
    }
}

fn app(behavior: Option<Behavior>) -> (Router, Arc<SqliteTutorRepository>) {
    let repository = Arc::new(SqliteTutorRepository::new(Database::new(":memory:").unwrap()));
    let generator = behavior.map(|b| Arc::new(FixedGenerator(b)) as Arc<dyn ReplyGenerator>);
    let state = AppState::new(repository.clone(), generator, &AppConfig::default());
    (router(Arc::new(state)), repository)
}

async fn session_for(repository: &SqliteTutorRepository, user_id: &str) -> String {
    repository
        .create_session(NewSession {
            user_id: user_id.to_string(),
            household_id: None,
            week: 1,
            mode: SessionMode::FreeConversation,
        })
        .await
        .unwrap()
        .id
}

fn json_request(method: Method, uri: &str, user: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

#[tokio::test]
async fn test_health_reports_provider() {
    let (app, _) = app(Some(Behavior::Reply("hola")));
    let (status, body) = send(app, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["provider"], "gemini");
}

#[tokio::test]
async fn test_chat_without_provider_is_500_before_auth() {
    let (app, _) = app(None);
    let request = json_request(Method::POST, "/api/chat", None, r#"{"session_id":"s","user_message":"Hola"}"#);
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Add GEMINI_API_KEY or OPENAI_API_KEY in environment variables.");
}

#[tokio::test]
async fn test_chat_requires_user() {
    let (app, _) = app(Some(Behavior::Reply("hola")));
    let request = json_request(Method::POST, "/api/chat", None, r#"{"session_id":"s","user_message":"Hola"}"#);
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_chat_invalid_json() {
    let (app, _) = app(Some(Behavior::Reply("hola")));
    let (status, body) = send(app, json_request(Method::POST, "/api/chat", Some("u1"), "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON");
}

fn untyped_post(uri: &str, user: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("x-user-id", user)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_chat_accepts_body_without_content_type() {
    let (app, repository) = app(Some(Behavior::Reply("¡Hola!")));
    let session_id = session_for(&repository, "u1").await;

    let body = json!({"session_id": session_id, "user_message": "Hola"}).to_string();
    let (status, body) = send(app.clone(), untyped_post("/api/chat", "u1", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "¡Hola!");

    let (status, body) = send(app, untyped_post("/api/chat", "u1", String::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON");
}

#[tokio::test]
async fn test_end_session_accepts_body_without_content_type() {
    let (app, repository) = app(None);
    let session_id = session_for(&repository, "u1").await;

    let body = json!({"session_id": session_id, "minutes": 4}).to_string();
    let (status, body) = send(app, untyped_post("/api/session/end", "u1", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["takeaway"], "Great session! Review your phrases in Progress.");
    let session = repository.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.minutes, Some(4));
}

#[tokio::test]
async fn test_chat_missing_fields() {
    let (app, _) = app(Some(Behavior::Reply("hola")));

    let (status, body) = send(app.clone(), json_request(Method::POST, "/api/chat", Some("u1"), "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "session_id required");

    let request = json_request(Method::POST, "/api/chat", Some("u1"), r#"{"session_id":"s","user_message":"  "}"#);
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user_message required");
}

#[tokio::test]
async fn test_chat_foreign_session_is_404() {
    let (app, repository) = app(Some(Behavior::Reply("hola")));
    let session_id = session_for(&repository, "owner").await;

    let body = json!({"session_id": session_id, "user_message": "Hola"}).to_string();
    let (status, body) = send(app, json_request(Method::POST, "/api/chat", Some("intruder"), &body)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");
    assert!(repository.transcript(&session_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_reply_and_opening() {
    let (app, repository) = app(Some(Behavior::Reply(" ¡Hola! ")));
    let session_id = session_for(&repository, "u1").await;

    let opening = json!({"session_id": session_id, "first_message": true, "week": 1}).to_string();
    let (status, body) = send(app.clone(), json_request(Method::POST, "/api/chat", Some("u1"), &opening)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "¡Hola!");

    let turn = json!({
        "session_id": session_id,
        "user_message": "Hola",
        "mode": "not_a_mode",
        "accent": "spain",
    })
    .to_string();
    let (status, body) = send(app, json_request(Method::POST, "/api/chat", Some("u1"), &turn)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "¡Hola!");

    assert_eq!(repository.transcript(&session_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_chat_rate_limit_is_429() {
    let (app, repository) = app(Some(Behavior::RateLimited));
    let session_id = session_for(&repository, "u1").await;

    let body = json!({"session_id": session_id, "user_message": "Hola"}).to_string();
    let (status, body) = send(app, json_request(Method::POST, "/api/chat", Some("u1"), &body)).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Gemini rate limit exceeded. Try again later.");
}

#[tokio::test]
async fn test_chat_rejects_non_positive_week() {
    let (app, _) = app(Some(Behavior::Reply("hola")));
    let request = json_request(Method::POST, "/api/chat", Some("u1"), r#"{"session_id":"s","week":0,"user_message":"Hola"}"#);
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_start_session_without_body() {
    let (app, repository) = app(None);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/session/start")
        .header("x-user-id", "u1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "free_conversation");
    assert_eq!(body["week"], 1);
    let session_id = body["session_id"].as_str().unwrap();
    assert!(repository.get_session(session_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_start_session_explicit_and_unknown_mode() {
    let (app, _) = app(None);

    let request = json_request(Method::POST, "/api/session/start", Some("u1"), r#"{"mode":"debate"}"#);
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "debate");

    let request = json_request(Method::POST, "/api/session/start", Some("u1"), r#"{"mode":"karaoke"}"#);
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown mode: karaoke");
}

#[tokio::test]
async fn test_end_session_returns_takeaway() {
    let (app, repository) = app(None);
    let session_id = session_for(&repository, "u1").await;

    let body = json!({"session_id": session_id, "minutes": 2.6}).to_string();
    let (status, body) = send(app, json_request(Method::POST, "/api/session/end", Some("u1"), &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["takeaway"], "Great session! Review your phrases in Progress.");
    let session = repository.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.minutes, Some(3));
}

#[tokio::test]
async fn test_end_session_foreign_and_missing() {
    let (app, repository) = app(None);
    let session_id = session_for(&repository, "owner").await;

    let body = json!({"session_id": session_id}).to_string();
    let (status, _) = send(app.clone(), json_request(Method::POST, "/api/session/end", Some("u1"), &body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(app, json_request(Method::POST, "/api/session/end", Some("u1"), "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "session_id required");
}

#[tokio::test]
async fn test_suggestion_and_progress() {
    let (app, _) = app(None);

    let (status, body) = send(app.clone(), get("/api/mode/suggestion", Some("u1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "free_conversation");
    assert_eq!(body["label"], "Free conversation");

    let (status, body) = send(app.clone(), get("/api/progress", Some("u1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["today"]["minutes"], 0);
    assert_eq!(body["daily_goal_minutes"], 30);

    let (status, _) = send(app, get("/api/progress", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
