use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{generate, owned_session};
use crate::config::LlmConfig;
use crate::error::Result;
use crate::llm::{GenerationRequest, ReplyGenerator};
use crate::metrics::MetricsCollector;
use crate::models::{AccentRegion, ChatTurn, NewSession, Profile, SessionMessage, SessionMode};
use crate::prompts::build_session_summary_prompt;
use crate::repository::TutorRepository;
use crate::stats::next_daily_stats;
use crate::suggestion::{suggested_mode, RECENT_MODES_WINDOW};
use crate::summary::{parse_session_summary, SessionExtraction};

/// What a client needs to begin chatting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStart {
    pub session_id: String,
    pub week: u32,
    pub mode: SessionMode,
    pub accent: AccentRegion,
    pub learner_memory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeSuggestion {
    pub mode: SessionMode,
    pub label: &'static str,
    pub week: u32,
}

/// Opens sessions and closes them with summary and bookkeeping
#[derive(Clone)]
pub struct SessionService {
    repository: Arc<dyn TutorRepository>,
    generator: Option<Arc<dyn ReplyGenerator>>,
    llm: LlmConfig,
    metrics: MetricsCollector,
}

impl SessionService {
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

    async fn profile_or_default(&self, user_id: &str) -> Result<Profile> {
        Ok(self
            .repository
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| Profile::new(user_id)))
    }

    /// Mode suggested for the learner's next session
    pub async fn suggest_mode(&self, user_id: &str) -> Result<ModeSuggestion> {
        let profile = self.profile_or_default(user_id).await?;
        let recent = self.repository.recent_session_modes(user_id, RECENT_MODES_WINDOW).await?;
        let mode = suggested_mode(profile.week, &recent);
        Ok(ModeSuggestion { mode, label: mode.label(), week: profile.week })
    }

    /// Create a session row; without an explicit mode the suggested one is used
    #[instrument(skip(self))]
    pub async fn start_session(&self, user_id: &str, mode: Option<SessionMode>) -> Result<SessionStart> {
        let profile = self.profile_or_default(user_id).await?;
        let mode = match mode {
            Some(mode) => mode,
            None => {
                let recent = self.repository.recent_session_modes(user_id, RECENT_MODES_WINDOW).await?;
                suggested_mode(profile.week, &recent)
            },
        };

        let session = self
            .repository
            .create_session(NewSession {
                user_id: user_id.to_string(),
                household_id: None,
                week: profile.week,
                mode,
            })
            .await?;

        self.metrics.record_session_started(session.week);
        info!(session_id = %session.id, week = session.week, mode = %mode, "Session started");

        Ok(SessionStart {
            session_id: session.id,
            week: session.week,
            mode,
            accent: profile.accent,
            learner_memory: profile.learner_memory,
        })
    }

    /// Close a session now
    pub async fn close(&self, user_id: &str, session_id: &str, minutes: u32) -> Result<String> {
        self.close_at(user_id, session_id, minutes, Utc::now()).await
    }

    /// Close a session as of `now`, returning the takeaway.
    ///
    /// Past the ownership check this always succeeds as far as summarization
    /// goes; only storage failures surface.
    #[instrument(skip(self, now))]
    pub async fn close_at(&self, user_id: &str, session_id: &str, minutes: u32, now: DateTime<Utc>) -> Result<String> {
        owned_session(self.repository.as_ref(), user_id, session_id).await?;

        let minutes = minutes.max(1);
        let transcript = self.repository.transcript(session_id).await?;
        let extraction = self.summarize(&transcript).await;

        self.repository
            .end_session(session_id, now, minutes, &extraction.summary_text())
            .await?;

        let today = now.date_naive();
        let existing_today = self.repository.daily_stats(user_id, today).await?;
        let yesterday = match today.checked_sub_days(Days::new(1)) {
            Some(day) => self.repository.daily_stats(user_id, day).await?,
            None => None,
        };
        let stats = next_daily_stats(user_id, today, existing_today.as_ref(), yesterday.as_ref(), minutes);
        self.repository.upsert_daily_stats(&stats).await?;

        let mistakes = self
            .repository
            .insert_mistakes(&extraction.mistake_events(user_id, session_id))
            .await?;
        let phrases = self
            .repository
            .insert_vocab_items(&extraction.vocab_items(user_id, today))
            .await?;

        if let Some(memory) = &extraction.memory {
            self.store_memory(user_id, memory).await?;
        }

        self.metrics.record_session_closed(minutes, extraction.memory.is_some());
        info!(
            minutes,
            streak = stats.streak_count,
            mistakes,
            phrases,
            "Session closed"
        );

        Ok(extraction.takeaway)
    }

    async fn store_memory(&self, user_id: &str, memory: &str) -> Result<()> {
        if self.repository.get_profile(user_id).await?.is_some() {
            self.repository.update_learner_memory(user_id, memory).await
        } else {
            let profile = Profile { learner_memory: Some(memory.to_string()), ..Profile::new(user_id) };
            self.repository.upsert_profile(&profile).await
        }
    }

    async fn summarize(&self, transcript: &[SessionMessage]) -> SessionExtraction {
        let Some(generator) = &self.generator else {
            return SessionExtraction::default();
        };
        if transcript.len() < 2 {
            return SessionExtraction::default();
        }

        let turns: Vec<ChatTurn> = transcript.iter().map(SessionMessage::to_turn).collect();
        let request = GenerationRequest {
            system: None,
            turns: vec![ChatTurn::user(build_session_summary_prompt(&turns))],
            max_tokens: self.llm.summary_max_tokens,
            temperature: self.llm.summary_temperature,
        };

        let text = match generate(generator, &self.metrics, "summary", request).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "Session summary failed, using defaults");
                self.metrics.record_summary_fallback("provider_error");
                return SessionExtraction::default();
            },
        };

        match parse_session_summary(&text) {
            Ok(extraction) => extraction,
            Err(err) => {
                warn!(error = %err, "Session summary unparseable, using defaults");
                self.metrics.record_summary_fallback("parse_error");
                SessionExtraction::default()
            },
        }
    }
}
