//! Tutoring services
//!
//! Each service owns an `Arc` of the repository and, where it talks to a model,
//! the reply generator chosen at start-up. Nothing here knows about HTTP.

use std::sync::Arc;

use tracing::warn;

use crate::error::{Result, TutorError};
use crate::llm::{GenerationRequest, ReplyGenerator};
use crate::logging::OperationTimer;
use crate::metrics::{MetricsCollector, MetricsTimer};
use crate::models::Session;
use crate::repository::TutorRepository;

mod chat;
mod progress;
mod session;

pub use chat::{ChatOrchestrator, OpeningRequest, TurnRequest, HISTORY_LIMIT, MISTAKE_LIMIT};
pub use progress::{DailySnapshot, MistakeCount, ProgressReport, ProgressService};
pub use session::{ModeSuggestion, SessionService, SessionStart};

/// Load a session and confirm `user_id` owns it.
///
/// Missing and foreign sessions are indistinguishable to the caller.
pub async fn owned_session(repository: &dyn TutorRepository, user_id: &str, session_id: &str) -> Result<Session> {
    match repository.get_session(session_id).await? {
        Some(session) if session.is_owned_by(user_id) => Ok(session),
        Some(_) => {
            warn!(session_id, "Session requested by a user who does not own it");
            Err(TutorError::SessionNotFound)
        },
        None => Err(TutorError::SessionNotFound),
    }
}

/// One timed, metered provider call
async fn generate(
    generator: &Arc<dyn ReplyGenerator>,
    metrics: &MetricsCollector,
    operation: &'static str,
    request: GenerationRequest,
) -> std::result::Result<String, crate::llm::ProviderError> {
    let provider = generator.provider();
    let timer = OperationTimer::new(&format!("{}_{}", provider.as_str(), operation));
    let metrics_timer = MetricsTimer::new(metrics.clone(), provider, operation);

    let result = generator.generate(request).await;
    match &result {
        Ok(_) => {
            metrics_timer.finish("success");
        },
        Err(err) => {
            metrics_timer.finish(err.outcome());
            warn!(provider = %provider, operation, error = %err, "Provider call failed");
        },
    }
    timer.finish();
    result
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use mockall::mock;

    use crate::llm::{GenerationRequest, ProviderError, ProviderKind, ReplyGenerator};

    mock! {
        pub Generator {}

        #[async_trait]
        impl ReplyGenerator for Generator {
            fn provider(&self) -> ProviderKind;
            async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError>;
        }
    }
}
