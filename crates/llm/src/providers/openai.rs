//! OpenAI-compatible chat-completions provider.
//!
//! Works against api.openai.com and any gateway that speaks the same
//! `/v1/chat/completions` protocol. Streaming responses arrive as server-sent
//! events: `data: {json}` lines terminated by `data: [DONE]`.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::providers::lines::into_lines;
use futures::StreamExt;
use groundwork_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Default API base URL.
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible LLM client.
pub struct OpenAiClient {
    /// Base URL, without the `/v1/...` path
    base_url: String,

    api_key: String,

    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for the public OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_OPENAI_ENDPOINT, api_key)
    }

    /// Create a client for a custom OpenAI-compatible endpoint.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn to_chat_request(&self, request: &LlmRequest, stream: bool) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send(&self, body: &ChatRequest) -> AppResult<reqwest::Response> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

/// Interpret one server-sent-event line.
///
/// Returns `None` for lines that carry nothing (blank keep-alives, comments,
/// `event:` fields, and payloads that fail to parse, which are skipped).
fn parse_event_line(line: &str) -> Option<LlmStreamChunk> {
    let data = line.strip_prefix("data:")?.trim_start();

    if data == "[DONE]" {
        return Some(LlmStreamChunk::finished(None));
    }

    match serde_json::from_str::<StreamResponse>(data) {
        Ok(event) => {
            let content: String = event
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .unwrap_or_default();
            Some(LlmStreamChunk::delta(content))
        }
        Err(e) => {
            tracing::debug!("Skipping malformed OpenAI stream event: {}", e);
            None
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to OpenAI");
        tracing::debug!("Model: {}", request.model);

        let body = self.to_chat_request(request, false);
        let response = self.send(&body).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let usage = chat
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        tracing::info!("Received completion from OpenAI ({} chars)", content.len());

        Ok(LlmResponse {
            content,
            model: chat.model,
            usage,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!("Starting streaming request to OpenAI");

        let body = self.to_chat_request(request, true);
        let response = self.send(&body).await?;

        let stream = into_lines(response.bytes_stream()).filter_map(|line| async move {
            match line {
                Ok(line) => parse_event_line(&line).map(Ok),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::with_base_url("http://localhost:8080/", "sk-test");
        assert_eq!(client.provider_name(), "openai");
        assert_eq!(
            client.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_conversion() {
        let client = OpenAiClient::new("sk-test");
        let request = LlmRequest::new("What is the deploy process?", "gpt-4")
            .with_system("Answer from context")
            .with_temperature(0.3)
            .with_max_tokens(1000);

        let chat = client.to_chat_request(&request, true);
        assert_eq!(chat.model, "gpt-4");
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].role, "user");
        assert_eq!(chat.messages[1].content, "What is the deploy process?");
        assert_eq!(chat.max_tokens, Some(1000));
        assert!(chat.stream);
    }

    #[test]
    fn test_request_without_system() {
        let client = OpenAiClient::new("sk-test");
        let chat = client.to_chat_request(&LlmRequest::new("hi", "gpt-4"), false);
        assert_eq!(chat.messages.len(), 1);
        assert!(!chat.stream);
    }

    #[test]
    fn test_parse_content_delta() {
        let chunk = parse_event_line(
            r#"data: {"id":"x","choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.content, "Hel");
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_role_only_delta() {
        let chunk =
            parse_event_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert!(chunk.content.is_empty());
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_done_marker() {
        let chunk = parse_event_line("data: [DONE]").unwrap();
        assert!(chunk.done);
    }

    #[test]
    fn test_parse_skips_noise() {
        assert!(parse_event_line("").is_none());
        assert!(parse_event_line(": keep-alive").is_none());
        assert!(parse_event_line("event: message").is_none());
        assert!(parse_event_line("data: {broken").is_none());
    }
}
