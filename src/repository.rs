use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::db::Database;
use crate::error::{Result, TutorError};
use crate::models::{
    ChatTurn, MistakeCategory, NewMistakeEvent, NewSession, NewVocabItem, Profile, Session, SessionMessage,
    UserStatsDaily, VocabItem,
};

/// Persistence operations the tutoring services depend on
#[async_trait]
pub trait TutorRepository: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;
    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;
    async fn update_learner_memory(&self, user_id: &str, memory: &str) -> Result<()>;

    async fn create_session(&self, new_session: NewSession) -> Result<Session>;
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>>;
    async fn end_session(&self, session_id: &str, ended_at: DateTime<Utc>, minutes: u32, summary: &str) -> Result<()>;
    /// Newest first
    async fn recent_session_modes(&self, user_id: &str, limit: usize) -> Result<Vec<String>>;

    /// Appends in slice order
    async fn append_messages(&self, session_id: &str, turns: &[ChatTurn]) -> Result<Vec<SessionMessage>>;
    /// The newest `limit` entries, oldest first
    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<SessionMessage>>;
    async fn transcript(&self, session_id: &str) -> Result<Vec<SessionMessage>>;

    /// Newest first
    async fn recent_mistake_categories(&self, user_id: &str, limit: usize) -> Result<Vec<MistakeCategory>>;
    async fn mistake_categories_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<MistakeCategory>>;
    async fn insert_mistakes(&self, mistakes: &[NewMistakeEvent]) -> Result<usize>;

    async fn insert_vocab_items(&self, items: &[NewVocabItem]) -> Result<usize>;
    async fn vocab_due(&self, user_id: &str, on: NaiveDate, limit: usize) -> Result<Vec<VocabItem>>;
    async fn vocab_upcoming(&self, user_id: &str, after: NaiveDate, limit: usize) -> Result<Vec<VocabItem>>;

    async fn daily_stats(&self, user_id: &str, date: NaiveDate) -> Result<Option<UserStatsDaily>>;
    /// Newest first
    async fn daily_stats_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<UserStatsDaily>>;
    async fn upsert_daily_stats(&self, stats: &UserStatsDaily) -> Result<()>;
}

/// SQLite-backed repository; each call runs on the blocking pool
#[derive(Clone)]
pub struct SqliteTutorRepository {
    database: Database,
}

impl SqliteTutorRepository {
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    /// Underlying database handle
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    async fn run<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let database = self.database.clone();
        tokio::task::spawn_blocking(move || operation(&database))
            .await
            .map_err(|e| TutorError::Other(format!("Database task failed: {e}")))?
    }
}

#[async_trait]
impl TutorRepository for SqliteTutorRepository {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let user_id = user_id.to_string();
        self.run(move |db| db.get_profile(&user_id)).await
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let profile = profile.clone();
        self.run(move |db| db.upsert_profile(&profile)).await
    }

    async fn update_learner_memory(&self, user_id: &str, memory: &str) -> Result<()> {
        let (user_id, memory) = (user_id.to_string(), memory.to_string());
        self.run(move |db| db.update_learner_memory(&user_id, &memory)).await
    }

    async fn create_session(&self, new_session: NewSession) -> Result<Session> {
        self.run(move |db| db.create_session(new_session)).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.run(move |db| db.get_session(&session_id)).await
    }

    async fn end_session(&self, session_id: &str, ended_at: DateTime<Utc>, minutes: u32, summary: &str) -> Result<()> {
        let (session_id, summary) = (session_id.to_string(), summary.to_string());
        self.run(move |db| db.end_session(&session_id, ended_at, minutes, &summary)).await
    }

    async fn recent_session_modes(&self, user_id: &str, limit: usize) -> Result<Vec<String>> {
        let user_id = user_id.to_string();
        self.run(move |db| db.recent_session_modes(&user_id, limit)).await
    }

    async fn append_messages(&self, session_id: &str, turns: &[ChatTurn]) -> Result<Vec<SessionMessage>> {
        let (session_id, turns) = (session_id.to_string(), turns.to_vec());
        self.run(move |db| db.append_messages(&session_id, &turns)).await
    }

    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<SessionMessage>> {
        let session_id = session_id.to_string();
        self.run(move |db| db.recent_messages(&session_id, limit)).await
    }

    async fn transcript(&self, session_id: &str) -> Result<Vec<SessionMessage>> {
        let session_id = session_id.to_string();
        self.run(move |db| db.transcript(&session_id)).await
    }

    async fn recent_mistake_categories(&self, user_id: &str, limit: usize) -> Result<Vec<MistakeCategory>> {
        let user_id = user_id.to_string();
        self.run(move |db| db.recent_mistake_categories(&user_id, limit)).await
    }

    async fn mistake_categories_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<MistakeCategory>> {
        let user_id = user_id.to_string();
        self.run(move |db| db.mistake_categories_since(&user_id, since)).await
    }

    async fn insert_mistakes(&self, mistakes: &[NewMistakeEvent]) -> Result<usize> {
        if mistakes.is_empty() {
            return Ok(0);
        }
        let mistakes = mistakes.to_vec();
        self.run(move |db| db.insert_mistakes(&mistakes)).await
    }

    async fn insert_vocab_items(&self, items: &[NewVocabItem]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let items = items.to_vec();
        self.run(move |db| db.insert_vocab_items(&items)).await
    }

    async fn vocab_due(&self, user_id: &str, on: NaiveDate, limit: usize) -> Result<Vec<VocabItem>> {
        let user_id = user_id.to_string();
        self.run(move |db| db.vocab_due(&user_id, on, limit)).await
    }

    async fn vocab_upcoming(&self, user_id: &str, after: NaiveDate, limit: usize) -> Result<Vec<VocabItem>> {
        let user_id = user_id.to_string();
        self.run(move |db| db.vocab_upcoming(&user_id, after, limit)).await
    }

    async fn daily_stats(&self, user_id: &str, date: NaiveDate) -> Result<Option<UserStatsDaily>> {
        let user_id = user_id.to_string();
        self.run(move |db| db.daily_stats(&user_id, date)).await
    }

    async fn daily_stats_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<UserStatsDaily>> {
        let user_id = user_id.to_string();
        self.run(move |db| db.daily_stats_since(&user_id, since)).await
    }

    async fn upsert_daily_stats(&self, stats: &UserStatsDaily) -> Result<()> {
        let stats = stats.clone();
        self.run(move |db| db.upsert_daily_stats(&stats)).await
    }
}
