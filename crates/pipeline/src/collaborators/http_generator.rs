//! Text generation through a messages-style LLM HTTP API.
//!
//! One request per call, no retry. Pacing between calls is the caller's
//! concern (see [`crate::pacing`]).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TextGenerator;
use crate::config::{env_or, ConfigError};
use crate::error::CollaboratorError;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const API_VERSION: &str = "2023-06-01";

/// Generation calls are slow; a single request may take a couple of minutes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Provider error bodies are truncated to this many characters in errors.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct HttpGeneratorConfig {
    pub api_url: String,
    /// Without a key every call fails, which the pipeline records as
    /// flagged sections.
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
}

impl HttpGeneratorConfig {
    /// | Env Var          | Default                                  |
    /// |------------------|------------------------------------------|
    /// | `LLM_API_URL`    | `https://api.anthropic.com/v1/messages`  |
    /// | `LLM_API_KEY`    | unset                                    |
    /// | `LLM_MODEL`      | `claude-sonnet-4-20250514`               |
    /// | `LLM_MAX_TOKENS` | `4096`                                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: env_or("LLM_API_URL", DEFAULT_API_URL.to_string())?,
            api_key: std::env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            model: env_or("LLM_MODEL", DEFAULT_MODEL.to_string())?,
            max_tokens: env_or("LLM_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Concatenate the text blocks of a response.
fn extract_text(response: MessagesResponse) -> Result<String, CollaboratorError> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n\n");

    let text = text.trim();
    if text.is_empty() {
        return Err(CollaboratorError::EmptyResponse);
    }
    Ok(text.to_string())
}

// ---------------------------------------------------------------------------
// HttpTextGenerator
// ---------------------------------------------------------------------------

pub struct HttpTextGenerator {
    client: reqwest::Client,
    config: HttpGeneratorConfig,
}

impl HttpTextGenerator {
    pub fn new(config: HttpGeneratorConfig) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> Result<String, CollaboratorError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(CollaboratorError::NotConfigured("LLM_API_KEY"))?;

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: system_prompt,
            messages: [RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        extract_text(response.json::<MessagesResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn response(json: serde_json::Value) -> MessagesResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn joins_text_blocks_and_skips_others() {
        let text = extract_text(response(serde_json::json!({
            "content": [
                {"type": "text", "text": "First paragraph."},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "Second paragraph."}
            ]
        })))
        .unwrap();
        assert_eq!(text, "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn blank_response_is_an_error() {
        assert_matches!(
            extract_text(response(serde_json::json!({
                "content": [{"type": "text", "text": "  "}]
            }))),
            Err(CollaboratorError::EmptyResponse)
        );
        assert_matches!(
            extract_text(response(serde_json::json!({}))),
            Err(CollaboratorError::EmptyResponse)
        );
    }

    #[test]
    fn request_serializes_messages_shape() {
        let request = MessagesRequest {
            model: "m",
            max_tokens: 10,
            system: "sys",
            messages: [RequestMessage {
                role: "user",
                content: "hello",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "sys");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let generator = HttpTextGenerator::new(HttpGeneratorConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
        .unwrap();
        assert_matches!(
            generator.generate_text("prompt", "system").await,
            Err(CollaboratorError::NotConfigured("LLM_API_KEY"))
        );
    }
}
