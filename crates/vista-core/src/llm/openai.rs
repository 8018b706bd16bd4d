//! OpenAI-compatible provider using the Chat Completions API.
//!
//! Sends the instruction and the image (remote URL or data URL) as one user
//! message with two content parts.

use super::provider::{resolve_env_var, CaptionProvider, CaptionRequest, CaptionResponse};
use crate::config::OpenAiConfig;
use crate::error::CaptionError;
use crate::types::TokenUsage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// OpenAI provider using Chat Completions API.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_endpoint(
            api_key,
            model,
            "https://api.openai.com/v1/chat/completions",
        )
    }

    /// Create with a custom endpoint (any OpenAI-compatible server).
    pub fn with_endpoint(api_key: &str, model: &str, endpoint: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Build from config, resolving `${ENV_VAR}` in the API key.
    ///
    /// `api_key_override` wins over the configured key when present.
    pub fn from_config(
        config: &OpenAiConfig,
        api_key_override: Option<&str>,
    ) -> Result<Self, CaptionError> {
        let api_key = api_key_override
            .map(String::from)
            .or_else(|| resolve_env_var(&config.api_key))
            .ok_or_else(|| {
                CaptionError::api("OpenAI API key not set. Set OPENAI_API_KEY env var.")
            })?;
        Ok(Self::with_endpoint(
            &api_key,
            &config.model,
            &config.endpoint,
        ))
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[async_trait]
impl CaptionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn caption(&self, request: &CaptionRequest) -> Result<CaptionResponse, CaptionError> {
        let start = Instant::now();

        let body = ChatRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ChatContent::Text {
                        text: request.instruction.clone(),
                    },
                    ChatContent::ImageUrl {
                        image_url: ImageUrl {
                            url: request.image.url(),
                        },
                    },
                ],
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("OpenAI request failed", &e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CaptionError::Api {
                message: format!("OpenAI HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .map_err(|e| transport_error("Failed to read OpenAI response", &e))?;

        let text = chat_resp
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| {
                CaptionError::api("OpenAI returned empty choices array, no content generated")
            })?;

        let usage = chat_resp
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CaptionResponse {
            text: text.trim().to_string(),
            model: chat_resp.model,
            usage,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Map a reqwest failure onto the error model.
///
/// Anything that went wrong before a complete response arrived (connect,
/// send, timeout, truncated body) is a [`CaptionError::Connection`]; a body
/// that arrived but doesn't parse is an `Api` error.
fn transport_error(context: &str, e: &reqwest::Error) -> CaptionError {
    let mut message = format!("{context}: {e}");
    let mut cause = std::error::Error::source(e);
    while let Some(inner) = cause {
        message.push_str(&format!(": {inner}"));
        cause = std::error::Error::source(inner);
    }

    if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() {
        CaptionError::Connection { message }
    } else {
        CaptionError::api(message)
    }
}
