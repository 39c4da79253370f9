use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{Result, TutorError};
use crate::models::{
    AccentRegion, ChatTurn, MessageRole, MistakeCategory, NewMistakeEvent, NewSession, NewVocabItem, Profile,
    Session, SessionMessage, SessionMode, UserStatsDaily, VocabItem,
};
use crate::schema::{mistake_events, profiles, session_messages, sessions, user_stats_daily, vocab_items};

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const IN_MEMORY: &str = ":memory:";

/// Database manager for handling connections and operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool with default pool settings
    pub fn new(database_url: &str) -> Result<Self> {
        Self::from_config(&DatabaseConfig { url: database_url.to_string(), ..DatabaseConfig::default() })
    }

    /// Create a new database connection pool from configuration
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let path = strip_scheme(&config.url);

        let (manager, max_size) = if path == IN_MEMORY {
            // Every in-memory connection is its own database, so the pool holds one.
            (SqliteConnectionManager::memory(), 1)
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            (SqliteConnectionManager::file(path), config.max_connections)
        };

        let manager = manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(max_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        debug!(url = %config.url, max_size, "Database pool ready");

        Ok(Self { pool })
    }

    /// Create the tables if they don't exist
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2026-10-01-000000_create_tables/up.sql"))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Insert or replace a learner profile
    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT ({}) DO UPDATE SET {} = excluded.{}, {} = excluded.{}, {} = excluded.{},
                 {} = excluded.{}, {} = excluded.{}, {} = excluded.{}, {} = excluded.{}",
                profiles::TABLE,
                profiles::ID,
                profiles::DISPLAY_NAME,
                profiles::ACCENT,
                profiles::DAILY_GOAL_MINUTES,
                profiles::WEEK,
                profiles::LEVEL_ESTIMATE,
                profiles::LEARNER_MEMORY,
                profiles::CREATED_AT,
                profiles::UPDATED_AT,
                profiles::ID,
                profiles::DISPLAY_NAME,
                profiles::DISPLAY_NAME,
                profiles::ACCENT,
                profiles::ACCENT,
                profiles::DAILY_GOAL_MINUTES,
                profiles::DAILY_GOAL_MINUTES,
                profiles::WEEK,
                profiles::WEEK,
                profiles::LEVEL_ESTIMATE,
                profiles::LEVEL_ESTIMATE,
                profiles::LEARNER_MEMORY,
                profiles::LEARNER_MEMORY,
                profiles::UPDATED_AT,
                profiles::UPDATED_AT,
            ),
            params![
                profile.id,
                profile.display_name,
                profile.accent,
                profile.daily_goal_minutes,
                profile.week,
                profile.level_estimate,
                profile.learner_memory,
                profile.created_at,
                profile.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a profile by user id
    pub fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let conn = self.get_connection()?;
        let profile = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", profiles::TABLE, profiles::ID),
                params![user_id],
                map_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Replace the learner memory on an existing profile
    pub fn update_learner_memory(&self, user_id: &str, memory: &str) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "UPDATE {} SET {} = ?, {} = ? WHERE {} = ?",
                profiles::TABLE,
                profiles::LEARNER_MEMORY,
                profiles::UPDATED_AT,
                profiles::ID
            ),
            params![memory, Utc::now(), user_id],
        )?;
        Ok(())
    }

    /// Create a session row
    pub fn create_session(&self, new_session: NewSession) -> Result<Session> {
        let conn = self.get_connection()?;
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: new_session.user_id,
            household_id: new_session.household_id,
            week: new_session.week,
            mode: new_session.mode,
            started_at: Utc::now(),
            ended_at: None,
            minutes: None,
            summary: None,
        };

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?)",
                sessions::TABLE,
                sessions::ID,
                sessions::USER_ID,
                sessions::HOUSEHOLD_ID,
                sessions::WEEK,
                sessions::MODE,
                sessions::STARTED_AT
            ),
            params![
                session.id,
                session.user_id,
                session.household_id,
                session.week,
                session.mode,
                session.started_at
            ],
        )?;

        Ok(session)
    }

    /// Get a session by id
    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let conn = self.get_connection()?;
        let session = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", sessions::TABLE, sessions::ID),
                params![session_id],
                map_session,
            )
            .optional()?;
        Ok(session)
    }

    /// Mark a session ended
    pub fn end_session(&self, session_id: &str, ended_at: DateTime<Utc>, minutes: u32, summary: &str) -> Result<()> {
        let conn = self.get_connection()?;
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET {} = ?, {} = ?, {} = ? WHERE {} = ?",
                sessions::TABLE,
                sessions::ENDED_AT,
                sessions::MINUTES,
                sessions::SUMMARY,
                sessions::ID
            ),
            params![ended_at, minutes, summary, session_id],
        )?;

        if updated == 0 {
            return Err(TutorError::SessionNotFound);
        }
        Ok(())
    }

    /// Modes of the user's most recent sessions, newest first
    pub fn recent_session_modes(&self, user_id: &str, limit: usize) -> Result<Vec<String>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY {} DESC, rowid DESC LIMIT ?",
            sessions::MODE,
            sessions::TABLE,
            sessions::USER_ID,
            sessions::STARTED_AT
        ))?;
        let modes = stmt
            .query_map(params![user_id, limit_param(limit)], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(modes)
    }

    /// Append messages to a session transcript, preserving slice order
    pub fn append_messages(&self, session_id: &str, turns: &[ChatTurn]) -> Result<Vec<SessionMessage>> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        let mut appended = Vec::with_capacity(turns.len());

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?)",
                session_messages::TABLE,
                session_messages::ID,
                session_messages::SESSION_ID,
                session_messages::ROLE,
                session_messages::CONTENT,
                session_messages::CREATED_AT
            ))?;

            for turn in turns {
                let message = SessionMessage {
                    id: Uuid::new_v4().to_string(),
                    session_id: session_id.to_string(),
                    role: turn.role,
                    content: turn.content.clone(),
                    created_at: Utc::now(),
                };
                stmt.execute(params![
                    message.id,
                    message.session_id,
                    message.role,
                    message.content,
                    message.created_at
                ])?;
                appended.push(message);
            }
        }

        tx.commit()?;
        Ok(appended)
    }

    /// The `limit` most recent transcript entries, in ascending order
    pub fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<SessionMessage>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} DESC, rowid DESC LIMIT ?",
            session_messages::TABLE,
            session_messages::SESSION_ID,
            session_messages::CREATED_AT
        ))?;
        let mut messages = stmt
            .query_map(params![session_id, limit_param(limit)], map_session_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }

    /// The whole transcript, in ascending order
    pub fn transcript(&self, session_id: &str) -> Result<Vec<SessionMessage>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} ASC, rowid ASC",
            session_messages::TABLE,
            session_messages::SESSION_ID,
            session_messages::CREATED_AT
        ))?;
        let messages = stmt
            .query_map(params![session_id], map_session_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }

    /// Categories of the user's most recent mistakes, newest first
    pub fn recent_mistake_categories(&self, user_id: &str, limit: usize) -> Result<Vec<MistakeCategory>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY {} DESC, rowid DESC LIMIT ?",
            mistake_events::CATEGORY,
            mistake_events::TABLE,
            mistake_events::USER_ID,
            mistake_events::CREATED_AT
        ))?;
        let categories = stmt
            .query_map(params![user_id, limit_param(limit)], |row| row.get::<_, MistakeCategory>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    /// Categories of every mistake recorded at or after `since`
    pub fn mistake_categories_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<MistakeCategory>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ? AND {} >= ?",
            mistake_events::CATEGORY,
            mistake_events::TABLE,
            mistake_events::USER_ID,
            mistake_events::CREATED_AT
        ))?;
        let categories = stmt
            .query_map(params![user_id, since], |row| row.get::<_, MistakeCategory>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    /// Insert mistake rows
    pub fn insert_mistakes(&self, mistakes: &[NewMistakeEvent]) -> Result<usize> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                mistake_events::TABLE,
                mistake_events::ID,
                mistake_events::USER_ID,
                mistake_events::SESSION_ID,
                mistake_events::CATEGORY,
                mistake_events::EXAMPLE_BEFORE,
                mistake_events::EXAMPLE_AFTER,
                mistake_events::CREATED_AT
            ))?;
            for mistake in mistakes {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    mistake.user_id,
                    mistake.session_id,
                    mistake.category,
                    mistake.example_before,
                    mistake.example_after,
                    Utc::now()
                ])?;
            }
        }
        tx.commit()?;
        Ok(mistakes.len())
    }

    /// Insert vocab rows
    pub fn insert_vocab_items(&self, items: &[NewVocabItem]) -> Result<usize> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                vocab_items::TABLE,
                vocab_items::ID,
                vocab_items::USER_ID,
                vocab_items::PHRASE_ES,
                vocab_items::PHRASE_EN,
                vocab_items::CONTEXT,
                vocab_items::NEXT_REVIEW_DATE,
                vocab_items::INTERVAL_DAYS,
                vocab_items::CREATED_AT
            ))?;
            for item in items {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    item.user_id,
                    item.phrase_es,
                    item.phrase_en,
                    item.context,
                    item.next_review_date,
                    item.interval_days,
                    Utc::now()
                ])?;
            }
        }
        tx.commit()?;
        Ok(items.len())
    }

    /// Vocab due on or before `on`, earliest first
    pub fn vocab_due(&self, user_id: &str, on: NaiveDate, limit: usize) -> Result<Vec<VocabItem>> {
        self.query_vocab("<=", user_id, on, limit)
    }

    /// Vocab scheduled strictly after `after`, earliest first
    pub fn vocab_upcoming(&self, user_id: &str, after: NaiveDate, limit: usize) -> Result<Vec<VocabItem>> {
        self.query_vocab(">", user_id, after, limit)
    }

    fn query_vocab(&self, comparison: &str, user_id: &str, date: NaiveDate, limit: usize) -> Result<Vec<VocabItem>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? AND {} {} ? ORDER BY {} ASC, rowid ASC LIMIT ?",
            vocab_items::TABLE,
            vocab_items::USER_ID,
            vocab_items::NEXT_REVIEW_DATE,
            comparison,
            vocab_items::NEXT_REVIEW_DATE
        ))?;
        let items = stmt
            .query_map(params![user_id, date, limit_param(limit)], map_vocab_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// The aggregate row for one user and day
    pub fn daily_stats(&self, user_id: &str, date: NaiveDate) -> Result<Option<UserStatsDaily>> {
        let conn = self.get_connection()?;
        let stats = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ? AND {} = ?",
                    user_stats_daily::TABLE,
                    user_stats_daily::USER_ID,
                    user_stats_daily::DATE
                ),
                params![user_id, date],
                map_daily_stats,
            )
            .optional()?;
        Ok(stats)
    }

    /// Aggregate rows on or after `since`, newest first
    pub fn daily_stats_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<UserStatsDaily>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? AND {} >= ? ORDER BY {} DESC",
            user_stats_daily::TABLE,
            user_stats_daily::USER_ID,
            user_stats_daily::DATE,
            user_stats_daily::DATE
        ))?;
        let rows = stmt
            .query_map(params![user_id, since], map_daily_stats)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Insert or overwrite the aggregate row keyed by (user, date)
    pub fn upsert_daily_stats(&self, stats: &UserStatsDaily) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT ({}, {}) DO UPDATE SET {} = excluded.{}, {} = excluded.{}, {} = excluded.{}",
                user_stats_daily::TABLE,
                user_stats_daily::USER_ID,
                user_stats_daily::DATE,
                user_stats_daily::MINUTES,
                user_stats_daily::STREAK_COUNT,
                user_stats_daily::SESSIONS_COUNT,
                user_stats_daily::USER_ID,
                user_stats_daily::DATE,
                user_stats_daily::MINUTES,
                user_stats_daily::MINUTES,
                user_stats_daily::STREAK_COUNT,
                user_stats_daily::STREAK_COUNT,
                user_stats_daily::SESSIONS_COUNT,
                user_stats_daily::SESSIONS_COUNT,
            ),
            params![stats.user_id, stats.date, stats.minutes, stats.streak_count, stats.sessions_count],
        )?;
        Ok(())
    }
}

/// Accepts `sqlite:path`, `sqlite://path` or a bare path
fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn map_profile(row: &Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(profiles::ID)?,
        display_name: row.get(profiles::DISPLAY_NAME)?,
        accent: row.get(profiles::ACCENT)?,
        daily_goal_minutes: row.get(profiles::DAILY_GOAL_MINUTES)?,
        week: row.get(profiles::WEEK)?,
        level_estimate: row.get(profiles::LEVEL_ESTIMATE)?,
        learner_memory: row.get(profiles::LEARNER_MEMORY)?,
        created_at: row.get(profiles::CREATED_AT)?,
        updated_at: row.get(profiles::UPDATED_AT)?,
    })
}

fn map_session(row: &Row) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(sessions::ID)?,
        user_id: row.get(sessions::USER_ID)?,
        household_id: row.get(sessions::HOUSEHOLD_ID)?,
        week: row.get(sessions::WEEK)?,
        mode: row.get(sessions::MODE)?,
        started_at: row.get(sessions::STARTED_AT)?,
        ended_at: row.get(sessions::ENDED_AT)?,
        minutes: row.get(sessions::MINUTES)?,
        summary: row.get(sessions::SUMMARY)?,
    })
}

fn map_session_message(row: &Row) -> rusqlite::Result<SessionMessage> {
    Ok(SessionMessage {
        id: row.get(session_messages::ID)?,
        session_id: row.get(session_messages::SESSION_ID)?,
        role: row.get(session_messages::ROLE)?,
        content: row.get(session_messages::CONTENT)?,
        created_at: row.get(session_messages::CREATED_AT)?,
    })
}

fn map_vocab_item(row: &Row) -> rusqlite::Result<VocabItem> {
    Ok(VocabItem {
        id: row.get(vocab_items::ID)?,
        user_id: row.get(vocab_items::USER_ID)?,
        phrase_es: row.get(vocab_items::PHRASE_ES)?,
        phrase_en: row.get(vocab_items::PHRASE_EN)?,
        context: row.get(vocab_items::CONTEXT)?,
        next_review_date: row.get(vocab_items::NEXT_REVIEW_DATE)?,
        interval_days: row.get(vocab_items::INTERVAL_DAYS)?,
        created_at: row.get(vocab_items::CREATED_AT)?,
    })
}

fn map_daily_stats(row: &Row) -> rusqlite::Result<UserStatsDaily> {
    Ok(UserStatsDaily {
        user_id: row.get(user_stats_daily::USER_ID)?,
        date: row.get(user_stats_daily::DATE)?,
        minutes: row.get(user_stats_daily::MINUTES)?,
        streak_count: row.get(user_stats_daily::STREAK_COUNT)?,
        sessions_count: row.get(user_stats_daily::SESSIONS_COUNT)?,
    })
}

fn unknown_value(kind: &str, value: &str) -> FromSqlError {
    FromSqlError::Other(format!("unknown {kind}: {value}").into())
}

impl ToSql for SessionMode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SessionMode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::parse(text).ok_or_else(|| unknown_value("session mode", text))
    }
}

impl ToSql for AccentRegion {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AccentRegion {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(Self::parse_or_default)
    }
}

impl ToSql for MistakeCategory {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MistakeCategory {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::parse(text).ok_or_else(|| unknown_value("mistake category", text))
    }
}

impl ToSql for MessageRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MessageRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::parse(text).ok_or_else(|| unknown_value("message role", text))
    }
}
