//! API Server Module
//!
//! Router, shared state and server start-up for the tutoring HTTP API.

use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{AppConfig, ServerConfig};
use crate::llm::{ProviderKind, ReplyGenerator};
use crate::repository::TutorRepository;
use crate::service::{ChatOrchestrator, ProgressService, SessionService};

mod auth;
mod error;
pub mod handlers;

pub use auth::AuthenticatedUser;
pub use error::ErrorBody;

/// Represents the state of the API server
pub struct AppState {
    /// Opening messages and tutor replies
    pub chat: ChatOrchestrator,
    /// Session start and close
    pub sessions: SessionService,
    /// Progress report
    pub progress: ProgressService,
    /// Provider chosen at start-up, if any
    pub provider: Option<ProviderKind>,
    /// Header carrying the authenticated user id
    pub user_header: String,
    /// Longest accepted learner message
    pub max_message_chars: usize,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn TutorRepository>,
        generator: Option<Arc<dyn ReplyGenerator>>,
        config: &AppConfig,
    ) -> Self {
        Self {
            chat: ChatOrchestrator::new(repository.clone(), generator.clone(), config.llm.clone()),
            sessions: SessionService::new(repository.clone(), generator.clone(), config.llm.clone()),
            progress: ProgressService::new(repository),
            provider: generator.as_ref().map(|generator| generator.provider()),
            user_header: config.server.user_header.to_ascii_lowercase(),
            max_message_chars: config.chat.max_message_chars,
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/session/start", post(handlers::start_session))
        .route("/api/session/end", post(handlers::end_session))
        .route("/api/mode/suggestion", get(handlers::mode_suggestion))
        .route("/api/progress", get(handlers::progress))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main API server
pub struct ApiServer {
    /// Server configuration
    config: ServerConfig,
    /// Shared state
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state: Arc::new(state) }
    }

    /// Start the API server
    pub async fn start(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let app = router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            addr = %addr,
            provider = self.state.provider.map_or("none", |p| p.as_str()),
            "Spanish tutor API listening"
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start API server: {}", e))?;

        Ok(())
    }
}
