//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.

/// Profiles table schema
pub mod profiles {
    /// Table name
    pub const TABLE: &str = "profiles";
    /// Primary key column (the auth user id)
    pub const ID: &str = "id";
    /// Display name column
    pub const DISPLAY_NAME: &str = "display_name";
    /// Accent/region column
    pub const ACCENT: &str = "accent";
    /// Daily goal column
    pub const DAILY_GOAL_MINUTES: &str = "daily_goal_minutes";
    /// Program week column
    pub const WEEK: &str = "week";
    /// Level estimate column
    pub const LEVEL_ESTIMATE: &str = "level_estimate";
    /// Learner memory column
    pub const LEARNER_MEMORY: &str = "learner_memory";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
    /// Update timestamp column
    pub const UPDATED_AT: &str = "updated_at";
}

/// Sessions table schema
pub mod sessions {
    /// Table name
    pub const TABLE: &str = "sessions";
    /// Primary key column
    pub const ID: &str = "id";
    /// Owning user column
    pub const USER_ID: &str = "user_id";
    /// Household column
    pub const HOUSEHOLD_ID: &str = "household_id";
    /// Program week column
    pub const WEEK: &str = "week";
    /// Practice mode column
    pub const MODE: &str = "mode";
    /// Start timestamp column
    pub const STARTED_AT: &str = "started_at";
    /// End timestamp column
    pub const ENDED_AT: &str = "ended_at";
    /// Elapsed minutes column
    pub const MINUTES: &str = "minutes";
    /// Summary column
    pub const SUMMARY: &str = "summary";
}

/// Session messages table schema
pub mod session_messages {
    /// Table name
    pub const TABLE: &str = "session_messages";
    /// Primary key column
    pub const ID: &str = "id";
    /// Owning session column
    pub const SESSION_ID: &str = "session_id";
    /// Role column
    pub const ROLE: &str = "role";
    /// Content column
    pub const CONTENT: &str = "content";
    /// Append timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Mistake events table schema
pub mod mistake_events {
    /// Table name
    pub const TABLE: &str = "mistake_events";
    /// Primary key column
    pub const ID: &str = "id";
    /// Learner column
    pub const USER_ID: &str = "user_id";
    /// Session column
    pub const SESSION_ID: &str = "session_id";
    /// Category column
    pub const CATEGORY: &str = "category";
    /// Incorrect example column
    pub const EXAMPLE_BEFORE: &str = "example_before";
    /// Corrected example column
    pub const EXAMPLE_AFTER: &str = "example_after";
    /// Insert timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Vocab items table schema
pub mod vocab_items {
    /// Table name
    pub const TABLE: &str = "vocab_items";
    /// Primary key column
    pub const ID: &str = "id";
    /// Learner column
    pub const USER_ID: &str = "user_id";
    /// Spanish phrase column
    pub const PHRASE_ES: &str = "phrase_es";
    /// English gloss column
    pub const PHRASE_EN: &str = "phrase_en";
    /// Context column
    pub const CONTEXT: &str = "context";
    /// Next review date column
    pub const NEXT_REVIEW_DATE: &str = "next_review_date";
    /// Interval column
    pub const INTERVAL_DAYS: &str = "interval_days";
    /// Insert timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Daily stats table schema
pub mod user_stats_daily {
    /// Table name
    pub const TABLE: &str = "user_stats_daily";
    /// Learner column (part of the primary key)
    pub const USER_ID: &str = "user_id";
    /// Calendar day column (part of the primary key)
    pub const DATE: &str = "date";
    /// Minutes column
    pub const MINUTES: &str = "minutes";
    /// Streak column
    pub const STREAK_COUNT: &str = "streak_count";
    /// Session count column
    pub const SESSIONS_COUNT: &str = "sessions_count";
}
