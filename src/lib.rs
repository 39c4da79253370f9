//! Spanish Tutor - Conversation Practice Service
//!
//! A Rust library and HTTP service that runs short Spanish conversation
//! sessions against a hosted language model and keeps the learner's
//! progress between them.
//!
//! # Features
//!
//! - Tutor prompts adapted to program week, session mode and accent
//! - Gemini or OpenAI replies, chosen once from the environment
//! - Session close with model summary, vocabulary and mistake tracking
//! - Daily minutes, session counts and streaks
//! - Mode suggestions and a progress report

/// HTTP routes, handlers and server
pub mod api;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Model provider adapters
pub mod llm;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Prompt builders
pub mod prompts;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Chat, session and progress services
pub mod service;
/// Daily statistics
pub mod stats;
/// Mode suggestion
pub mod suggestion;
/// Session summary parsing
pub mod summary;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use error::{Result, TutorError};
pub use models::{AccentRegion, MistakeCategory, SessionMode};
pub use repository::{SqliteTutorRepository, TutorRepository};
