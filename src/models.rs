//! Data models for tutoring sessions and learner progress
//!
//! This module contains all data structures used throughout the application,
//! including the closed enumerations (modes, accents, mistake categories) and
//! the row types persisted by the repository.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversational style for a practice session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Natural back-and-forth conversation
    #[default]
    FreeConversation,
    /// Scenario-based roleplay
    Roleplay,
    /// Learner tells a short story
    Storytelling,
    /// Very short, quick exchanges
    SpeedRound,
    /// Light opinion debate
    Debate,
}

impl SessionMode {
    /// All modes, in display order
    pub const ALL: [Self; 5] = [
        Self::FreeConversation,
        Self::Roleplay,
        Self::Storytelling,
        Self::SpeedRound,
        Self::Debate,
    ];

    /// Wire/storage name of the mode
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FreeConversation => "free_conversation",
            Self::Roleplay => "roleplay",
            Self::Storytelling => "storytelling",
            Self::SpeedRound => "speed_round",
            Self::Debate => "debate",
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::FreeConversation => "Free conversation",
            Self::Roleplay => "Roleplay",
            Self::Storytelling => "Storytelling",
            Self::SpeedRound => "Speed round",
            Self::Debate => "Debate",
        }
    }

    /// Strict parse; `None` for unknown names
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == value)
    }

    /// Lenient parse: unknown names become free conversation
    #[must_use]
    pub fn parse_or_default(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regional vocabulary preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccentRegion {
    /// Mexican Spanish
    Mexico,
    /// Peninsular Spanish
    Spain,
    /// Colombian Spanish
    Colombia,
    /// No regional preference
    #[default]
    Neutral,
}

impl AccentRegion {
    /// Wire/storage name of the accent
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mexico => "mexico",
            Self::Spain => "spain",
            Self::Colombia => "colombia",
            Self::Neutral => "neutral",
        }
    }

    /// Lenient parse: unknown names become neutral
    #[must_use]
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "mexico" => Self::Mexico,
            "spain" => Self::Spain,
            "colombia" => Self::Colombia,
            _ => Self::Neutral,
        }
    }
}

impl fmt::Display for AccentRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of learner error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MistakeCategory {
    /// Ser vs. estar
    SerEstar,
    /// Noun/adjective gender agreement
    GenderAgreement,
    /// Verb conjugation
    VerbConjugation,
    /// Word order
    WordOrder,
    /// Articles
    Articles,
    /// Prepositions
    Prepositions,
    /// Anything else
    Other,
}

impl MistakeCategory {
    /// All categories, in prompt order
    pub const ALL: [Self; 7] = [
        Self::SerEstar,
        Self::GenderAgreement,
        Self::VerbConjugation,
        Self::WordOrder,
        Self::Articles,
        Self::Prepositions,
        Self::Other,
    ];

    /// Wire/storage name of the category
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SerEstar => "ser_estar",
            Self::GenderAgreement => "gender_agreement",
            Self::VerbConjugation => "verb_conjugation",
            Self::WordOrder => "word_order",
            Self::Articles => "articles",
            Self::Prepositions => "prepositions",
            Self::Other => "other",
        }
    }

    /// Strict parse; `None` for anything outside the closed set
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == value)
    }
}

impl fmt::Display for MistakeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The learner
    User,
    /// The tutor
    Assistant,
    /// Out-of-band instruction
    System,
}

impl MessageRole {
    /// Wire/storage name of the role
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Strict parse; `None` for unknown roles
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role-tagged piece of conversation sent to a model provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who said it
    pub role: MessageRole,
    /// What was said
    pub content: String,
}

impl ChatTurn {
    /// A learner turn
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    /// A tutor turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

/// Learner identity and preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// User id issued by the auth layer
    pub id: String,
    /// Display name
    pub display_name: Option<String>,
    /// Preferred accent/region
    pub accent: AccentRegion,
    /// Daily practice goal in minutes (15, 30, 45 or 60)
    pub daily_goal_minutes: u32,
    /// Current program week (1-4)
    pub week: u32,
    /// Rough level estimate (A0, A1, A2)
    pub level_estimate: String,
    /// Running summary of the learner's progress
    pub learner_memory: Option<String>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A fresh profile with the onboarding defaults
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            display_name: None,
            accent: AccentRegion::Neutral,
            daily_goal_minutes: 30,
            week: 1,
            level_estimate: "A0".to_string(),
            learner_memory: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One practice conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session id
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Household the user belonged to at session start
    pub household_id: Option<String>,
    /// Program week at session start
    pub week: u32,
    /// Practice mode
    pub mode: SessionMode,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time, set once by the session closer
    pub ended_at: Option<DateTime<Utc>>,
    /// Elapsed minutes reported at close
    pub minutes: Option<u32>,
    /// Takeaway plus optional memory suffix
    pub summary: Option<String>,
}

impl Session {
    /// True when the session belongs to `user_id`
    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Input for creating a session row
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Owning user
    pub user_id: String,
    /// Optional household
    pub household_id: Option<String>,
    /// Program week
    pub week: u32,
    /// Practice mode
    pub mode: SessionMode,
}

/// Transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    /// Message id
    pub id: String,
    /// Owning session
    pub session_id: String,
    /// Author
    pub role: MessageRole,
    /// Text
    pub content: String,
    /// Append time
    pub created_at: DateTime<Utc>,
}

impl SessionMessage {
    /// Provider-facing view of this message
    #[must_use]
    pub fn to_turn(&self) -> ChatTurn {
        ChatTurn { role: self.role, content: self.content.clone() }
    }
}

/// A categorized learner error extracted at session close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeEvent {
    /// Row id
    pub id: String,
    /// Learner
    pub user_id: String,
    /// Session the mistake came from
    pub session_id: String,
    /// Category
    pub category: MistakeCategory,
    /// Learner's incorrect text
    pub example_before: String,
    /// Corrected text
    pub example_after: String,
    /// Insert time
    pub created_at: DateTime<Utc>,
}

/// Input for a mistake row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMistakeEvent {
    /// Learner
    pub user_id: String,
    /// Session the mistake came from
    pub session_id: String,
    /// Category
    pub category: MistakeCategory,
    /// Learner's incorrect text
    pub example_before: String,
    /// Corrected text
    pub example_after: String,
}

/// Spaced-repetition flashcard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabItem {
    /// Row id
    pub id: String,
    /// Learner
    pub user_id: String,
    /// Spanish phrase
    pub phrase_es: String,
    /// English gloss
    pub phrase_en: Option<String>,
    /// Where the phrase came from
    pub context: Option<String>,
    /// Next review date
    pub next_review_date: NaiveDate,
    /// Current review interval
    pub interval_days: u32,
    /// Insert time
    pub created_at: DateTime<Utc>,
}

/// Input for a vocab row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVocabItem {
    /// Learner
    pub user_id: String,
    /// Spanish phrase
    pub phrase_es: String,
    /// English gloss
    pub phrase_en: Option<String>,
    /// Where the phrase came from
    pub context: Option<String>,
    /// Next review date
    pub next_review_date: NaiveDate,
    /// Review interval
    pub interval_days: u32,
}

/// Per-user, per-day aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatsDaily {
    /// Learner
    pub user_id: String,
    /// UTC calendar day
    pub date: NaiveDate,
    /// Minutes practiced that day
    pub minutes: u32,
    /// Consecutive active days ending that day
    pub streak_count: u32,
    /// Sessions completed that day
    pub sessions_count: u32,
}
