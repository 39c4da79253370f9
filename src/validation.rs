use crate::error::{Result, TutorError};

/// Longest session the closer will record, in minutes
pub const MAX_SESSION_MINUTES: u32 = 24 * 60;

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate session id presence
    pub fn validate_session_id(session_id: Option<&str>) -> Result<&str> {
        match session_id.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(TutorError::InvalidInput("session_id required".to_string())),
        }
    }

    /// Validate a learner message for a tutoring turn
    pub fn validate_user_message(message: Option<&str>, max_chars: usize) -> Result<String> {
        let message = message.map(Self::sanitize_text).unwrap_or_default();
        if message.is_empty() {
            return Err(TutorError::InvalidInput("user_message required".to_string()));
        }

        if message.chars().count() > max_chars {
            return Err(TutorError::InvalidInput(format!(
                "Message too long (max {max_chars} characters)"
            )));
        }

        Ok(message)
    }

    /// Clamp client-reported session length; missing or non-positive becomes 1
    #[must_use]
    pub fn normalize_minutes(minutes: Option<f64>) -> u32 {
        match minutes {
            Some(value) if value.is_finite() && value >= 1.0 => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let rounded = value.round().min(f64::from(MAX_SESSION_MINUTES)) as u32;
                rounded
            },
            _ => 1,
        }
    }

    /// Validate a program week supplied by a client
    pub fn validate_week(week: Option<i64>) -> Result<u32> {
        match week {
            None => Ok(1),
            Some(value) => u32::try_from(value)
                .ok()
                .filter(|week| *week >= 1)
                .ok_or_else(|| TutorError::InvalidInput("week must be a positive integer".to_string())),
        }
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Validate database URL
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(TutorError::InvalidConfig("Database URL cannot be empty".to_string()));
        }

        if url.len() > 1000 {
            return Err(TutorError::InvalidConfig("Database URL too long".to_string()));
        }

        Ok(())
    }
}
