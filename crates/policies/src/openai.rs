//! OpenAI-compatible chat model.
//!
//! Talks to any endpoint exposing `/chat/completions` (OpenAI, OpenRouter,
//! Ollama, vLLM, ...). Non-streaming, no tool calls and no retries: every
//! transport or protocol problem becomes a `PolicyError` and ends the run.

use async_trait::async_trait;
use loopwright_core::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::chat::{ChatMessage, ChatModel, ChatRole, ModelReply};

pub struct OpenAiChatModel {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiChatModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Result<Self, PolicyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PolicyError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        let messages: Vec<ApiMessage<'_>> = messages
            .iter()
            .map(|m| ApiMessage {
                role: api_role(m.role),
                content: &m.content,
            })
            .collect();

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stream": false,
        })
    }
}

/// The wire role for a message. Observations have no matching `tool_calls`
/// entry, so they are sent as system messages rather than `tool` messages.
fn api_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System | ChatRole::Tool => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

/// Map a non-200 status to the error the loop reports.
fn status_error(status: u16, body: String) -> PolicyError {
    match status {
        401 | 403 => {
            PolicyError::Authentication("Invalid API key or insufficient permissions".into())
        }
        429 => PolicyError::RateLimited {
            retry_after_secs: 5,
        },
        _ => PolicyError::Unavailable(format!("HTTP {status}: {body}")),
    }
}

fn parse_reply(api_response: ApiResponse, requested_model: &str) -> Result<ModelReply, PolicyError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| PolicyError::MalformedResponse("No choices in response".into()))?;

    let content = choice
        .message
        .content
        .ok_or_else(|| PolicyError::MalformedResponse("Choice has no content".into()))?;

    Ok(ModelReply {
        content,
        model: api_response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
    })
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, PolicyError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(messages);

        debug!(model = %self.model, messages = messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PolicyError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(status_error(status, error_body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| PolicyError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        parse_reply(api_response, &self.model)
    }
}

// --- OpenAI API wire types ---

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}
