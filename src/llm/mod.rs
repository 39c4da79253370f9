//! # Reply generation
//!
//! Defines the [`ReplyGenerator`] trait, the single capability the orchestrators
//! depend on, plus one adapter per hosted model provider. Which adapter runs is
//! decided once, from [`ProviderCredentials`], and injected at construction time.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::models::ChatTurn;

mod gemini;
mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// The two interchangeable hosted providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Gemini
    Gemini,
    /// OpenAI Chat Completions
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    /// User-facing message when the provider rejects a call for rate/quota reasons
    #[must_use]
    pub const fn rate_limit_message(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini rate limit exceeded. Try again later.",
            Self::OpenAi => "OpenAI quota exceeded. Add payment at platform.openai.com.",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gemini => "Gemini",
            Self::OpenAi => "OpenAI",
        })
    }
}

/// API keys found in the environment
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    /// `GEMINI_API_KEY`
    pub gemini_api_key: Option<String>,
    /// `OPENAI_API_KEY`
    pub openai_api_key: Option<String>,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ProviderCredentials {
    /// Read both keys; blank values count as absent
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: non_blank(std::env::var("GEMINI_API_KEY").ok()),
            openai_api_key: non_blank(std::env::var("OPENAI_API_KEY").ok()),
        }
    }

    /// Gemini when its key is present, otherwise OpenAI when its key is present
    #[must_use]
    pub fn selected(&self) -> Option<ProviderKind> {
        if self.gemini_api_key.is_some() {
            Some(ProviderKind::Gemini)
        } else if self.openai_api_key.is_some() {
            Some(ProviderKind::OpenAi)
        } else {
            None
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Provider-neutral request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System instruction
    pub system: Option<String>,
    /// Conversation, oldest first; the last entry is what the model answers
    pub turns: Vec<ChatTurn>,
    /// Output token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// Failures reported by a provider adapter
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP 429 / quota exhausted
    #[error("{provider} rate limited: {message}")]
    RateLimited {
        /// Provider
        provider: ProviderKind,
        /// Provider's own message
        message: String,
    },

    /// Non-success status; the message is the provider's own text
    #[error("{message}")]
    Api {
        /// Provider
        provider: ProviderKind,
        /// HTTP status
        status: u16,
        /// Provider's own message
        message: String,
    },

    /// Connection or timeout failure
    #[error("{provider} request failed: {message}")]
    Transport {
        /// Provider
        provider: ProviderKind,
        /// Transport error text
        message: String,
    },

    /// Success status with a body we could not read
    #[error("Failed to parse {provider} response: {message}")]
    InvalidResponse {
        /// Provider
        provider: ProviderKind,
        /// Parse error text
        message: String,
    },
}

impl ProviderError {
    /// Metrics label
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Api { .. } => "api_error",
            Self::Transport { .. } => "transport_error",
            Self::InvalidResponse { .. } => "invalid_response",
        }
    }
}

/// The single "generate reply" capability
///
/// Implementations return the raw (untrimmed) reply text, or an empty string when
/// the provider answered without text. Callers decide the fallback.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Which provider answers
    fn provider(&self) -> ProviderKind;

    /// Make exactly one provider call
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError>;
}

/// Build the adapter for whichever credential is present
#[must_use]
pub fn build_generator(credentials: &ProviderCredentials, config: &LlmConfig) -> Option<Arc<dyn ReplyGenerator>> {
    match credentials.selected()? {
        ProviderKind::Gemini => {
            let key = credentials.gemini_api_key.clone()?;
            Some(Arc::new(
                GeminiClient::new(key, config.gemini_model.clone()).with_base_url(config.gemini_base_url.clone()),
            ))
        },
        ProviderKind::OpenAi => {
            let key = credentials.openai_api_key.clone()?;
            Some(Arc::new(
                OpenAiClient::new(key, config.openai_model.clone()).with_base_url(config.openai_base_url.clone()),
            ))
        },
    }
}

/// Pull a human-readable message out of a provider error body
fn error_message_from_body(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct Wrapper {
        error: ErrorBody,
    }

    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_str::<Wrapper>(body)
        .ok()
        .and_then(|wrapper| wrapper.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| body.to_string())
}
