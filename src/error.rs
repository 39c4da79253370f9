//! Error types for the spanish-tutor library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the application.

use thiserror::Error;

use crate::llm::{ProviderError, ProviderKind};

/// Errors that can occur in the spanish-tutor application.
#[derive(Error, Debug)]
pub enum TutorError {
    /// Malformed or missing client input
    #[error("{0}")]
    InvalidInput(String),

    /// No authenticated user on the request
    #[error("Unauthorized")]
    Unauthorized,

    /// Session does not exist or belongs to someone else
    #[error("Session not found")]
    SessionNotFound,

    /// Neither provider credential is configured
    #[error("Add GEMINI_API_KEY or OPENAI_API_KEY in environment variables.")]
    ProviderNotConfigured,

    /// The configured provider refused the call because of rate limits or quota
    #[error("{}", .provider.rate_limit_message())]
    RateLimited {
        /// Provider that rejected the call
        provider: ProviderKind,
    },

    /// Any other provider failure, carrying the provider's message
    #[error("{0}")]
    Provider(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with TutorError
pub type Result<T> = std::result::Result<T, TutorError>;

impl TutorError {
    /// HTTP status code this error is reported with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Unauthorized => 401,
            Self::SessionNotFound => 404,
            Self::RateLimited { .. } => 429,
            Self::ProviderNotConfigured
            | Self::Provider(_)
            | Self::Database(_)
            | Self::Pool(_)
            | Self::Io(_)
            | Self::InvalidConfig(_)
            | Self::Serialization(_)
            | Self::Other(_) => 500,
        }
    }

    /// Short label used for logs and error metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthorized => "unauthorized",
            Self::SessionNotFound => "session_not_found",
            Self::ProviderNotConfigured => "provider_not_configured",
            Self::RateLimited { .. } => "rate_limited",
            Self::Provider(_) => "provider",
            Self::Database(_) | Self::Pool(_) => "database",
            Self::Io(_) => "io",
            Self::InvalidConfig(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

impl From<ProviderError> for TutorError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { provider, .. } => Self::RateLimited { provider },
            other => Self::Provider(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TutorError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(TutorError::Unauthorized.status_code(), 401);
        assert_eq!(TutorError::SessionNotFound.status_code(), 404);
        assert_eq!(
            TutorError::RateLimited { provider: ProviderKind::Gemini }.status_code(),
            429
        );
        assert_eq!(TutorError::ProviderNotConfigured.status_code(), 500);
        assert_eq!(TutorError::Provider("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_rate_limit_message_is_provider_specific() {
        let gemini = TutorError::RateLimited { provider: ProviderKind::Gemini };
        let openai = TutorError::RateLimited { provider: ProviderKind::OpenAi };
        assert_eq!(gemini.to_string(), "Gemini rate limit exceeded. Try again later.");
        assert_eq!(
            openai.to_string(),
            "OpenAI quota exceeded. Add payment at platform.openai.com."
        );
    }

    #[test]
    fn test_provider_error_passes_message_through() {
        let err: TutorError = ProviderError::Api {
            provider: ProviderKind::OpenAi,
            status: 400,
            message: "model not found".into(),
        }
        .into();
        assert_eq!(err.to_string(), "model not found");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_rate_limited_provider_error_converts() {
        let err: TutorError = ProviderError::RateLimited {
            provider: ProviderKind::Gemini,
            message: "RESOURCE_EXHAUSTED".into(),
        }
        .into();
        assert!(matches!(err, TutorError::RateLimited { provider: ProviderKind::Gemini }));
    }
}
