//! OpenAI chat completions client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AskDbError, Result};
use crate::llm::types::Message;
use crate::llm::LlmClient;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Attempts per completion for transient HTTP failures (429, 5xx, connect/timeout).
const MAX_RETRY_ATTEMPTS: u32 = 3;

const RETRY_BASE_DELAY_MS: u64 = 1000;

/// OpenAI client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Overrides the API endpoint (OpenAI-compatible gateways).
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// OpenAI LLM client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AskDbError::llm(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Parses an API error response and returns (error, is_retryable).
    fn parse_error(status: reqwest::StatusCode, body: &str) -> (AskDbError, bool) {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return (
                AskDbError::llm("Authentication failed. Check your OPENAI_API_KEY."),
                false,
            );
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return (AskDbError::llm("Rate limited. Please wait and try again."), true);
        }

        let retryable = status.is_server_error();
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|r| format!("OpenAI API error: {}", r.error.message))
            .unwrap_or_else(|_| format!("OpenAI API error ({status}): {body}"));
        (AskDbError::llm(message), retryable)
    }

    /// Sends one request; the error carries whether a retry may succeed.
    async fn send_once(
        &self,
        messages: &[Message],
    ) -> std::result::Result<String, (AskDbError, bool)> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let retryable = e.is_timeout() || e.is_connect();
                let error = if e.is_timeout() {
                    AskDbError::llm("Request timed out. Try again.")
                } else if e.is_connect() {
                    AskDbError::llm("Failed to connect to OpenAI API. Check your network.")
                } else {
                    AskDbError::llm(format!("Request failed: {e}"))
                };
                (error, retryable)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| (AskDbError::llm(format!("Failed to read response: {e}")), false))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| (AskDbError::llm(format!("Failed to parse response: {e}")), false))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| (AskDbError::llm("No response from OpenAI"), false))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;

        loop {
            debug!(attempt, model = %self.config.model, "OpenAI completion request");
            match self.send_once(messages).await {
                Ok(content) => return Ok(content),
                Err((error, retryable)) if retryable && attempt < MAX_RETRY_ATTEMPTS => {
                    warn!(attempt, ?delay, %error, "OpenAI request failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err((error, _)) => return Err(error),
            }
        }
    }
}
