//! API Handlers Module
//!
//! Request handlers for the tutoring API.

use std::sync::Arc;

use axum::debug_handler;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::auth::AuthenticatedUser;
use super::error::parse_json;
use super::AppState;
use crate::error::{Result, TutorError};
use crate::models::{AccentRegion, SessionMode};
use crate::service::{ModeSuggestion, OpeningRequest, ProgressReport, SessionStart, TurnRequest};
use crate::validation::InputValidator;

/// `POST /api/chat` body; everything optional so missing fields get precise errors
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub user_message: Option<String>,
    #[serde(default)]
    pub first_message: bool,
    pub mode: Option<String>,
    pub week: Option<i64>,
    pub accent: Option<String>,
    pub learner_memory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    pub mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EndSessionRequest {
    pub session_id: Option<String>,
    pub minutes: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeawayResponse {
    pub takeaway: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub provider: Option<&'static str>,
}

/// Health check endpoint
#[debug_handler(state = Arc<AppState>)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "spanish-tutor",
        provider: state.provider.map(|provider| provider.as_str()),
    })
}

/// Opening greeting or tutor reply
///
/// Provider configuration is checked before authentication, then the body.
#[debug_handler(state = Arc<AppState>)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    user: std::result::Result<AuthenticatedUser, TutorError>,
    body: Bytes,
) -> Result<Json<MessageResponse>> {
    state.chat.ensure_configured()?;
    let user = user?;
    let request: ChatRequest = parse_json(&body)?;

    let session_id = InputValidator::validate_session_id(request.session_id.as_deref())?.to_string();
    let week = InputValidator::validate_week(request.week)?;

    if request.first_message {
        state.chat.owned_session(user.id(), &session_id).await?;
        debug!(session_id, week, "Opening message requested");
        let message = state.chat.opening_message(OpeningRequest { session_id, week }).await?;
        return Ok(Json(MessageResponse { message }));
    }

    let user_message = InputValidator::validate_user_message(request.user_message.as_deref(), state.max_message_chars)?;
    state.chat.owned_session(user.id(), &session_id).await?;

    let turn = TurnRequest {
        session_id,
        user_message,
        mode: request.mode.as_deref().map(SessionMode::parse_or_default).unwrap_or_default(),
        week,
        accent: request.accent.as_deref().map(AccentRegion::parse_or_default).unwrap_or_default(),
        learner_memory: request.learner_memory,
    };
    let message = state.chat.reply(user.id(), turn).await?;
    Ok(Json(MessageResponse { message }))
}

/// Create a session for the authenticated learner
#[debug_handler(state = Arc<AppState>)]
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    body: Bytes,
) -> Result<Json<SessionStart>> {
    let request = if body.is_empty() {
        StartSessionRequest::default()
    } else {
        parse_json::<StartSessionRequest>(&body)?
    };

    let mode = match request.mode.as_deref().map(str::trim).filter(|mode| !mode.is_empty()) {
        Some(name) => Some(
            SessionMode::parse(name).ok_or_else(|| TutorError::InvalidInput(format!("Unknown mode: {name}")))?,
        ),
        None => None,
    };

    let started = state.sessions.start_session(user.id(), mode).await?;
    Ok(Json(started))
}

/// Close a session and return its takeaway
#[debug_handler(state = Arc<AppState>)]
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    body: Bytes,
) -> Result<Json<TakeawayResponse>> {
    let request: EndSessionRequest = parse_json(&body)?;
    let session_id = InputValidator::validate_session_id(request.session_id.as_deref())?;
    let minutes = InputValidator::normalize_minutes(request.minutes);

    let takeaway = state.sessions.close(user.id(), session_id, minutes).await?;
    Ok(Json(TakeawayResponse { takeaway }))
}

#[debug_handler(state = Arc<AppState>)]
pub async fn mode_suggestion(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<ModeSuggestion>> {
    Ok(Json(state.sessions.suggest_mode(user.id()).await?))
}

#[debug_handler(state = Arc<AppState>)]
pub async fn progress(State(state): State<Arc<AppState>>, user: AuthenticatedUser) -> Result<Json<ProgressReport>> {
    Ok(Json(state.progress.report(user.id()).await?))
}
