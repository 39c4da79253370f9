//! Gemini `generateContent` REST adapter.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{error_message_from_body, GenerationRequest, ProviderError, ProviderKind, ReplyGenerator};
use crate::models::{ChatTurn, MessageRole};
use crate::prompts::OPENING_TRIGGER;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Reply generator backed by the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: if model.trim().is_empty() { DEFAULT_GEMINI_MODEL.to_string() } else { model },
            base_url: BASE_URL.to_string(),
        }
    }

    /// Points the client at another host, e.g. a proxy or a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ReplyGenerator for GeminiClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    #[instrument(skip(self, request), fields(model = %self.model, turns = request.turns.len()))]
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let body = GenerateContentRequest::from_generation(&request);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport {
                provider: ProviderKind::Gemini,
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| ProviderError::InvalidResponse {
            provider: ProviderKind::Gemini,
            message: err.to_string(),
        })?;

        let text = parsed.text();
        debug!(chars = text.len(), "Gemini reply received");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub(crate) contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system_instruction: Option<Content>,
    pub(crate) generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<&'static str>,
    pub(crate) parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub(crate) temperature: f32,
    pub(crate) max_output_tokens: u32,
}

impl GenerateContentRequest {
    /// Gemini takes the system prompt separately, knows only `user` and `model`,
    /// and wants the conversation to open with a user turn.
    pub(crate) fn from_generation(request: &GenerationRequest) -> Self {
        let mut contents: Vec<Content> = request
            .turns
            .iter()
            .filter_map(|turn| {
                let role = match turn.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                    MessageRole::System => return None,
                };
                Some(Content { role: Some(role), parts: vec![Part { text: turn.content.clone() }] })
            })
            .collect();

        if contents.first().is_some_and(|content| content.role == Some("model")) {
            let trigger = ChatTurn::user(OPENING_TRIGGER);
            contents.insert(0, Content { role: Some("user"), parts: vec![Part { text: trigger.content }] });
        }

        let system_instruction = request
            .system
            .as_ref()
            .filter(|text| !text.trim().is_empty())
            .map(|text| Content { role: None, parts: vec![Part { text: text.clone() }] });

        Self {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate; empty when there is none.
    fn text(self) -> String {
        self.candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect::<String>())
            .unwrap_or_default()
    }
}

fn map_http_error(status: StatusCode, body: &str) -> ProviderError {
    let message = error_message_from_body(body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited { provider: ProviderKind::Gemini, message }
    } else {
        ProviderError::Api { provider: ProviderKind::Gemini, status: status.as_u16(), message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(turns: Vec<ChatTurn>) -> GenerationRequest {
        GenerationRequest {
            system: Some("Be a tutor".into()),
            turns,
            max_tokens: 400,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_roles_are_mapped_and_system_rows_dropped() {
        let body = GenerateContentRequest::from_generation(&request(vec![
            ChatTurn::user("Hola"),
            ChatTurn { role: MessageRole::System, content: "note".into() },
            ChatTurn::assistant("¡Hola! ¿Cómo estás?"),
            ChatTurn::user("Bien"),
        ]));

        let roles: Vec<_> = body.contents.iter().map(|c| c.role.unwrap()).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(body.system_instruction.unwrap().parts[0].text, "Be a tutor");
    }

    #[test]
    fn test_leading_model_turn_gets_trigger() {
        let body = GenerateContentRequest::from_generation(&request(vec![
            ChatTurn::assistant("¡Hola! Escribe Hola."),
            ChatTurn::user("Hola"),
        ]));

        assert_eq!(body.contents.len(), 3);
        assert_eq!(body.contents[0].role, Some("user"));
        assert_eq!(body.contents[0].parts[0].text, OPENING_TRIGGER);
        assert_eq!(body.contents[1].role, Some("model"));
    }

    #[test]
    fn test_serialized_shape_is_camel_case() {
        let body = GenerateContentRequest::from_generation(&request(vec![ChatTurn::user("Hola")]));
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("systemInstruction").is_some());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 400);
        assert!(json["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn test_missing_candidates_yield_empty_text() {
        let parsed: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(parsed.text(), "");
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text(), "");
    }

    #[test]
    fn test_rate_limit_mapping() {
        let err = map_http_error(StatusCode::TOO_MANY_REQUESTS, r#"{"error":{"message":"Resource exhausted"}}"#);
        assert!(matches!(err, ProviderError::RateLimited { provider: ProviderKind::Gemini, .. }));

        let err = map_http_error(StatusCode::BAD_REQUEST, r#"{"error":{"message":"API key not valid"}}"#);
        assert_eq!(err.to_string(), "API key not valid");
    }
}
