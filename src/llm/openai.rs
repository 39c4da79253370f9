//! OpenAI Chat Completions adapter.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{error_message_from_body, GenerationRequest, ProviderError, ProviderKind, ReplyGenerator};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const BASE_URL: &str = "https://api.openai.com/v1";

/// Reply generator backed by the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    /// Creates a new client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: if model.trim().is_empty() { DEFAULT_OPENAI_MODEL.to_string() } else { model },
            base_url: BASE_URL.to_string(),
        }
    }

    /// Points the client at another host, e.g. a proxy or a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    #[instrument(skip(self, request), fields(model = %self.model, turns = request.turns.len()))]
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest::from_generation(&self.model, &request);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport {
                provider: ProviderKind::OpenAi,
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| ProviderError::InvalidResponse {
            provider: ProviderKind::OpenAi,
            message: err.to_string(),
        })?;

        let text = parsed.text();
        debug!(chars = text.len(), "OpenAI reply received");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub(crate) model: &'a str,
    pub(crate) messages: Vec<ChatMessage<'a>>,
    pub(crate) max_tokens: u32,
    pub(crate) temperature: f32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub(crate) role: &'a str,
    pub(crate) content: &'a str,
}

impl<'a> ChatCompletionRequest<'a> {
    pub(crate) fn from_generation(model: &'a str, request: &'a GenerationRequest) -> Self {
        let system = request
            .system
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(|content| ChatMessage { role: "system", content });

        let messages = system
            .into_iter()
            .chain(request.turns.iter().map(|turn| ChatMessage {
                role: turn.role.as_str(),
                content: turn.content.as_str(),
            }))
            .collect();

        Self {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default()
    }
}

fn map_http_error(status: StatusCode, body: &str) -> ProviderError {
    let message = error_message_from_body(body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited { provider: ProviderKind::OpenAi, message }
    } else {
        ProviderError::Api { provider: ProviderKind::OpenAi, status: status.as_u16(), message }
    }
}
