//! Natural-language to SQL translation.
//!
//! The core depends only on the [`Translator`] trait. [`LlmTranslator`]
//! implements it on top of any [`LlmClient`] by building a schema-aware
//! prompt and extracting the first SQL code block from the reply.

pub mod factory;
pub mod mock;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod types;

pub use factory::create_client;
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::{parse_llm_response, ParsedResponse};
pub use prompt::{build_messages, build_system_prompt};
pub use types::{Message, Role};

use async_trait::async_trait;
use std::str::FromStr;
use std::time::Instant;

use crate::db::Schema;
use crate::error::{AskDbError, Result};

/// Trait for LLM clients that can generate completions.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages.
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Converts a question into a candidate SQL string.
///
/// Called at most once per request. Errors carry a user-facing description.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, question: &str) -> Result<String>;
}

/// Translator backed by an LLM.
pub struct LlmTranslator {
    client: Box<dyn LlmClient>,
    schema: Schema,
}

impl LlmTranslator {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self {
            client,
            schema: Schema::default(),
        }
    }

    /// Grounds prompts in the given schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, question: &str) -> Result<String> {
        let start = Instant::now();
        let messages = build_messages(&self.schema, question);

        tracing::debug!(
            question_len = question.len(),
            tables = self.schema.tables.len(),
            "Sending translation request"
        );
        let reply = self.client.complete(&messages).await?;
        let parsed = parse_llm_response(&reply);

        match parsed.sql {
            Some(sql) => {
                tracing::info!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    sql_len = sql.len(),
                    "Translation produced SQL"
                );
                Ok(sql)
            }
            None => {
                tracing::info!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Translation produced no SQL"
                );
                let reason = if parsed.text.is_empty() {
                    "The model returned no SQL".to_string()
                } else {
                    parsed.text
                };
                Err(AskDbError::llm(reason))
            }
        }
    }
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    #[default]
    OpenAi,
    /// Canned responses, no API key required.
    Mock,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = AskDbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            _ => Err(AskDbError::config(format!("Unknown LLM provider: {s}"))),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
