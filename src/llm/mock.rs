//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{AskDbError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

enum Canned {
    Reply(String),
    Error(String),
}

/// Mock LLM client that returns canned responses based on input patterns.
#[derive(Default)]
pub struct MockLlmClient {
    /// Pattern -> reply, checked in insertion order.
    custom: Vec<(String, Canned)>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// When the question contains `pattern`, reply with `response` verbatim.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom
            .push((pattern.into(), Canned::Reply(response.into())));
        self
    }

    /// When the question contains `pattern`, reply with ```` ```sql ```` wrapping `sql`.
    pub fn with_sql(self, pattern: impl Into<String>, sql: impl AsRef<str>) -> Self {
        let fenced = format!("```sql\n{}\n```", sql.as_ref());
        self.with_response(pattern, fenced)
    }

    /// When the question contains `pattern`, fail with `message`.
    pub fn with_error(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.custom
            .push((pattern.into(), Canned::Error(message.into())));
        self
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn mock_response(&self, input: &str) -> Result<String> {
        let input_lower = input.to_lowercase();

        for (pattern, canned) in &self.custom {
            if input_lower.contains(&pattern.to_lowercase()) {
                return match canned {
                    Canned::Reply(reply) => Ok(reply.clone()),
                    Canned::Error(message) => Err(AskDbError::llm(message.clone())),
                };
            }
        }

        let reply = if input_lower.contains("all users") || input_lower.contains("show users") {
            "```sql\nSELECT * FROM users;\n```"
        } else if input_lower.contains("count") && input_lower.contains("orders") {
            "```sql\nSELECT COUNT(*) FROM orders;\n```"
        } else if input_lower.contains("budget") && input_lower.contains("department") {
            "```sql\nSELECT dept, SUM(budget) FROM budgets GROUP BY dept\n```"
        } else {
            "I don't understand that question. Could you please rephrase it?"
        };
        Ok(reply.to_string())
    }

    fn extract_user_input(messages: &[Message]) -> &str {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.mock_response(Self::extract_user_input(messages))
    }
}
