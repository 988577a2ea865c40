//! LLM client: OpenAI-compatible chat completions returning JSON objects.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default timeout for one LLM call.
const LLM_TIMEOUT_SECS: u64 = 10;

/// Errors from the LLM boundary.
///
/// All variants are recoverable at the pipeline level; callers map them to
/// the error kind of the stage they run in.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport failure (connect, timeout, TLS).
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("LLM API error {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Response carried no parsable JSON object.
    #[error("LLM response parse error: {0}")]
    Parse(String),
}

/// Seam for the planning and extraction LLM calls.
///
/// The contract: given a system prompt describing a JSON skeleton and a user
/// prompt, return a structurally conformant JSON object. Tests script this
/// trait with canned values.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one prompt pair; returns the parsed JSON object.
    async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<serde_json::Value, LlmError>;
}

/// Request body for chat completions (OpenAI format).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    typ: &'static str,
}

/// Response: choices[0].message.content.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for chat completions.
pub struct HttpLlmClient {
    client: reqwest::Client,
    inference_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpLlmClient {
    /// Build a client against an OpenAI-compatible completions endpoint.
    #[must_use]
    pub fn new(inference_url: String, model: String, api_key: Option<String>) -> Self {
        Self::with_timeout(inference_url, model, api_key, LLM_TIMEOUT_SECS)
    }

    /// Build a client with an explicit request timeout.
    #[must_use]
    pub fn with_timeout(
        inference_url: String,
        model: String,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            inference_url,
            model,
            api_key,
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<serde_json::Value, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat { typ: "json_object" },
        };
        let mut req = self
            .client
            .post(&self.inference_url)
            .json(&body)
            .header("Content-Type", "application/json");
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        let res = req
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::Parse(format!("{e}; body: {text}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("response has no content".to_string()))?;
        parse_json_object(&content)
    }
}

/// Extract a JSON object from model output, tolerating code fences.
pub(crate) fn parse_json_object(content: &str) -> Result<serde_json::Value, LlmError> {
    let trimmed = strip_code_fences(content.trim());
    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| LlmError::Parse(format!("{e}; content: {trimmed}")))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(LlmError::Parse(format!(
            "expected a JSON object, got: {value}"
        )))
    }
}

fn strip_code_fences(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    // Skip the language tag on the opening fence line.
    let rest = rest.find('\n').map_or(rest, |i| &rest[i + 1..]);
    rest.strip_suffix("```").map_or(rest, str::trim_end).trim()
}
