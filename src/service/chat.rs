use std::sync::Arc;

use tracing::{info, instrument};

use super::{generate, owned_session};
use crate::config::LlmConfig;
use crate::error::{Result, TutorError};
use crate::llm::{GenerationRequest, ReplyGenerator};
use crate::metrics::MetricsCollector;
use crate::models::{AccentRegion, ChatTurn, Session, SessionMode};
use crate::prompts::{
    build_opening_prompt, build_tutor_system_prompt, TutorPromptOptions, OPENING_FALLBACK, OPENING_TRIGGER,
    TURN_FALLBACK,
};
use crate::repository::TutorRepository;

/// Transcript entries sent with each turn
pub const HISTORY_LIMIT: usize = 20;

/// Recent mistake categories mentioned in the tutor prompt
pub const MISTAKE_LIMIT: usize = 5;

/// First tutor message of a session
#[derive(Debug, Clone)]
pub struct OpeningRequest {
    pub session_id: String,
    pub week: u32,
}

/// One learner message and the context to answer it in
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub session_id: String,
    pub user_message: String,
    pub mode: SessionMode,
    pub week: u32,
    pub accent: AccentRegion,
    pub learner_memory: Option<String>,
}

/// Produces tutor replies and keeps the transcript in step with them
#[derive(Clone)]
pub struct ChatOrchestrator {
    repository: Arc<dyn TutorRepository>,
    generator: Option<Arc<dyn ReplyGenerator>>,
    llm: LlmConfig,
    metrics: MetricsCollector,
}

impl ChatOrchestrator {
    pub fn new(
        repository: Arc<dyn TutorRepository>,
        generator: Option<Arc<dyn ReplyGenerator>>,
        llm: LlmConfig,
    ) -> Self {
        Self {
            repository,
            generator,
            llm,
            metrics: MetricsCollector::default(),
        }
    }

    /// The configured generator, or the misconfiguration error
    pub fn ensure_configured(&self) -> Result<&Arc<dyn ReplyGenerator>> {
        self.generator.as_ref().ok_or(TutorError::ProviderNotConfigured)
    }

    pub async fn owned_session(&self, user_id: &str, session_id: &str) -> Result<Session> {
        owned_session(self.repository.as_ref(), user_id, session_id).await
    }

    /// Greeting for a freshly started session; appended to the transcript
    #[instrument(skip(self, request), fields(session_id = %request.session_id, week = request.week))]
    pub async fn opening_message(&self, request: OpeningRequest) -> Result<String> {
        let generator = self.ensure_configured()?;

        let generation = GenerationRequest {
            system: Some(build_opening_prompt(request.week)),
            turns: vec![ChatTurn::user(OPENING_TRIGGER)],
            max_tokens: self.llm.opening_max_tokens,
            temperature: self.llm.chat_temperature,
        };

        let text = generate(generator, &self.metrics, "opening", generation)
            .await
            .map_err(|err| self.provider_failure(err, "opening"))?;
        let message = non_empty_or(text, OPENING_FALLBACK);

        self.repository
            .append_messages(&request.session_id, &[ChatTurn::assistant(message.clone())])
            .await?;

        info!(chars = message.len(), "Opening message sent");
        Ok(message)
    }

    /// Tutor reply to one learner message.
    ///
    /// The learner message and the reply are appended together, only after the
    /// provider answered.
    #[instrument(skip(self, user_id, request), fields(session_id = %request.session_id, mode = %request.mode))]
    pub async fn reply(&self, user_id: &str, request: TurnRequest) -> Result<String> {
        let generator = self.ensure_configured()?;

        let history = self.repository.recent_messages(&request.session_id, HISTORY_LIMIT).await?;
        let last_mistakes = self.repository.recent_mistake_categories(user_id, MISTAKE_LIMIT).await?;

        let system_prompt = build_tutor_system_prompt(&TutorPromptOptions {
            week: request.week,
            mode: request.mode,
            accent: request.accent,
            learner_memory: request.learner_memory.as_deref(),
            last_mistakes: &last_mistakes,
        });

        let mut turns: Vec<ChatTurn> = history.iter().map(|message| message.to_turn()).collect();
        turns.push(ChatTurn::user(request.user_message.clone()));

        let generation = GenerationRequest {
            system: Some(system_prompt),
            turns,
            max_tokens: self.llm.chat_max_tokens,
            temperature: self.llm.chat_temperature,
        };

        let text = generate(generator, &self.metrics, "chat", generation)
            .await
            .map_err(|err| self.provider_failure(err, "chat"))?;
        let reply = non_empty_or(text, TURN_FALLBACK);

        self.repository
            .append_messages(
                &request.session_id,
                &[ChatTurn::user(request.user_message), ChatTurn::assistant(reply.clone())],
            )
            .await?;

        info!(history = history.len(), chars = reply.len(), "Tutor reply sent");
        Ok(reply)
    }

    fn provider_failure(&self, err: crate::llm::ProviderError, operation: &'static str) -> TutorError {
        let err = TutorError::from(err);
        self.metrics.record_error(err.kind(), operation);
        err
    }
}

fn non_empty_or(text: String, fallback: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::llm::{ProviderError, ProviderKind};
    use crate::models::{MessageRole, NewSession};
    use crate::repository::SqliteTutorRepository;
    use crate::service::test_support::MockGenerator;

    async fn setup(generator: Option<MockGenerator>) -> (ChatOrchestrator, Arc<SqliteTutorRepository>, Session) {
        let repository = Arc::new(SqliteTutorRepository::new(Database::new(":memory:").unwrap()));
        let session = repository
            .create_session(NewSession {
                user_id: "u1".into(),
                household_id: None,
                week: 1,
                mode: SessionMode::FreeConversation,
            })
            .await
            .unwrap();
        let generator = generator.map(|g| Arc::new(g) as Arc<dyn ReplyGenerator>);
        let orchestrator = ChatOrchestrator::new(repository.clone(), generator, LlmConfig::default());
        (orchestrator, repository, session)
    }

    fn turn(session_id: &str, message: &str) -> TurnRequest {
        TurnRequest {
            session_id: session_id.to_string(),
            user_message: message.to_string(),
            mode: SessionMode::FreeConversation,
            week: 1,
            accent: AccentRegion::Neutral,
            learner_memory: None,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_provider() {
        let (orchestrator, _, session) = setup(None).await;
        let err = orchestrator.reply("u1", turn(&session.id, "Hola")).await.unwrap_err();
        assert!(matches!(err, TutorError::ProviderNotConfigured));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_blank_opening_uses_fallback() {
        let mut generator = MockGenerator::new();
        generator.expect_provider().return_const(ProviderKind::Gemini);
        generator
            .expect_generate()
            .withf(|request| {
                request.turns == vec![ChatTurn::user(OPENING_TRIGGER)]
                    && request.max_tokens == 250
                    && request.system.as_deref().is_some_and(|s| s.contains("first practice session"))
            })
            .times(1)
            .returning(|_| Ok("   ".to_string()));

        let (orchestrator, repository, session) = setup(Some(generator)).await;
        let message = orchestrator
            .opening_message(OpeningRequest { session_id: session.id.clone(), week: 1 })
            .await
            .unwrap();

        assert_eq!(message, OPENING_FALLBACK);
        let transcript = repository.transcript(&session.id).await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_reply_appends_both_messages_in_order() {
        let mut generator = MockGenerator::new();
        generator.expect_provider().return_const(ProviderKind::OpenAi);
        generator
            .expect_generate()
            .withf(|request| request.turns.last() == Some(&ChatTurn::user("Hola")) && request.max_tokens == 400)
            .returning(|_| Ok("  ¡Hola! ¿Cómo estás?  ".to_string()));

        let (orchestrator, repository, session) = setup(Some(generator)).await;
        let reply = orchestrator.reply("u1", turn(&session.id, "Hola")).await.unwrap();
        assert_eq!(reply, "¡Hola! ¿Cómo estás?");

        let transcript = repository.transcript(&session.id).await.unwrap();
        let contents: Vec<_> = transcript.iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(
            contents,
            vec![(MessageRole::User, "Hola"), (MessageRole::Assistant, "¡Hola! ¿Cómo estás?")]
        );
    }

    #[tokio::test]
    async fn test_blank_reply_uses_fallback() {
        let mut generator = MockGenerator::new();
        generator.expect_provider().return_const(ProviderKind::Gemini);
        generator.expect_generate().times(1).returning(|_| Ok("  \n ".to_string()));

        let (orchestrator, repository, session) = setup(Some(generator)).await;
        let reply = orchestrator.reply("u1", turn(&session.id, "Hola")).await.unwrap();
        assert_eq!(reply, TURN_FALLBACK);
        assert_eq!(reply, "No response.");

        let transcript = repository.transcript(&session.id).await.unwrap();
        let contents: Vec<_> = transcript.iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(
            contents,
            vec![(MessageRole::User, "Hola"), (MessageRole::Assistant, "No response.")]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_appends_nothing() {
        let mut generator = MockGenerator::new();
        generator.expect_provider().return_const(ProviderKind::Gemini);
        generator.expect_generate().returning(|_| {
            Err(ProviderError::RateLimited { provider: ProviderKind::Gemini, message: "quota".into() })
        });

        let (orchestrator, repository, session) = setup(Some(generator)).await;
        let err = orchestrator.reply("u1", turn(&session.id, "Hola")).await.unwrap_err();
        assert_eq!(err.status_code(), 429);
        assert_eq!(err.to_string(), "Gemini rate limit exceeded. Try again later.");
        assert!(repository.transcript(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owned_session_hides_foreign_sessions() {
        let (orchestrator, _, session) = setup(None).await;
        assert!(orchestrator.owned_session("u1", &session.id).await.is_ok());
        let err = orchestrator.owned_session("intruder", &session.id).await.unwrap_err();
        assert!(matches!(err, TutorError::SessionNotFound));
    }
}
