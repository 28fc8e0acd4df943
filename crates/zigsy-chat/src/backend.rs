//! Chat collaborator.
//!
//! The pipeline calls [`ChatBackend::invoke`] once per conversational turn.
//! [`OllamaBackend`] talks to a local Ollama server over its `/api/chat`
//! endpoint without streaming.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use zigsy_core::config::ChatBackendConfig;
use zigsy_core::types::ConversationTurn;

use crate::error::ChatError;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Produce one reply. `history` holds completed turns only, oldest first.
    async fn invoke(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        user_message: &str,
    ) -> Result<String, ChatError>;
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    message: Option<ApiReply>,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    content: String,
}

pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &ChatBackendConfig) -> Self {
        Self::new(&config.base_url, &config.model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(
        &'a self,
        system_prompt: &'a str,
        history: &'a [ConversationTurn],
        user_message: &'a str,
    ) -> ApiRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ApiMessage {
            role: "system",
            content: system_prompt,
        });
        messages.extend(history.iter().map(|turn| ApiMessage {
            role: turn.role.as_str(),
            content: &turn.content,
        }));
        messages.push(ApiMessage {
            role: "user",
            content: user_message,
        });

        ApiRequest {
            model: &self.model,
            messages,
            stream: false,
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    async fn invoke(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        user_message: &str,
    ) -> Result<String, ChatError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_request(system_prompt, history, user_message);

        debug!(model = %self.model, history = history.len(), "Sending chat request");

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Chat backend returned error");
            return Err(ChatError::LlmError(format!(
                "backend returned {}: {}",
                status, error_body
            )));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| ChatError::LlmError(format!("Failed to parse response: {e}")))?;

        parsed
            .message
            .map(|m| m.content.trim().to_string())
            .ok_or_else(|| ChatError::LlmError("No message in response".to_string()))
    }
}
