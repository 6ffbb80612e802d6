//! Chat client for OpenAI-compatible completion endpoints (Groq by default).

use crate::config::LlmConfig;
use crate::conversation::{Role, Turn};
use crate::error::{Result, VoiceLoopError};
use crate::llm::sse;
use crate::llm::stream::{ChatModel, TokenStream};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;

/// One message as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// System instruction first, then the history in order.
pub fn build_messages(system_prompt: &str, history: &[Turn]) -> Vec<ChatMessage> {
    std::iter::once(ChatMessage {
        role: "system",
        content: system_prompt.to_string(),
    })
    .chain(history.iter().map(|turn| ChatMessage {
        role: match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        },
        content: turn.content.clone(),
    }))
    .collect()
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
    max_completion_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Streaming chat client over HTTP.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

impl OpenAiCompatibleClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_key: api_key.into(),
        }
    }

    /// Build a client, reading the key from the configured variable.
    ///
    /// # Errors
    /// Returns `VoiceLoopError::MissingApiKey` if the variable is unset or empty.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        match env::var(&config.api_key_env) {
            Ok(key) if !key.is_empty() => Ok(Self::new(config.clone(), key)),
            _ => Err(VoiceLoopError::MissingApiKey {
                var: config.api_key_env.clone(),
            }),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, history: &[Turn], stream: bool) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.config.model,
            messages: build_messages(&self.config.system_prompt, history),
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            max_completion_tokens: self.config.max_completion_tokens,
            stream,
        }
    }

    async fn send(&self, history: &[Turn], stream: bool) -> Result<reqwest::Response> {
        debug!(
            model = %self.config.model,
            turns = history.len(),
            stream,
            "sending chat request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(history, stream))
            .send()
            .await
            .map_err(|e| VoiceLoopError::LlmRequest {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceLoopError::LlmRequest {
                message: format!("{}: {}", status, body.trim()),
            });
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiCompatibleClient {
    async fn stream_chat(&self, history: &[Turn]) -> Result<TokenStream> {
        let response = self.send(history, true).await?;
        Ok(sse::token_stream(response.bytes_stream()))
    }

    async fn complete(&self, history: &[Turn]) -> Result<String> {
        let response = self.send(history, false).await?;
        let parsed: ChatResponse = response.json().await.map_err(|e| VoiceLoopError::LlmRequest {
            message: format!("Invalid completion response: {}", e),
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
