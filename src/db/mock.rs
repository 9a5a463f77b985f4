//! Mock database clients for testing.
//!
//! `MockDatabaseClient` answers from scripted responses and records every
//! statement it receives, so tests can assert on exactly what was executed.

use super::{ColumnInfo, DatabaseClient, QueryResult, Schema, Value};
use crate::error::{AskDbError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

enum Scripted {
    Rows(QueryResult),
    Error(String),
}

/// A mock database client that returns predefined results.
#[derive(Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    scripted: Vec<(String, Scripted)>,
    executed: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the schema returned by `introspect_schema`.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Returns `result` for any statement containing `pattern` (case-insensitive).
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.scripted.push((pattern.into(), Scripted::Rows(result)));
        self
    }

    /// Fails any statement containing `pattern` with `message`.
    pub fn with_error(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripted
            .push((pattern.into(), Scripted::Error(message.into())));
        self
    }

    /// Returns every statement executed so far, oldest first.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Returns how many statements were executed.
    pub fn call_count(&self) -> usize {
        self.executed.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// True once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn default_result(sql: &str) -> QueryResult {
        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            QueryResult::with_data(
                vec![ColumnInfo::new("result", "text")],
                vec![vec![Value::String(format!("Mock result for: {sql}"))]],
            )
        } else {
            QueryResult::new()
        }
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut log) = self.executed.lock() {
            log.push(sql.to_string());
        }

        let sql_lower = sql.to_lowercase();
        let scripted = self
            .scripted
            .iter()
            .find(|(pattern, _)| sql_lower.contains(&pattern.to_lowercase()));

        let result = match scripted {
            Some((_, Scripted::Rows(result))) => result.clone(),
            Some((_, Scripted::Error(message))) => return Err(AskDbError::query(message.clone())),
            None => Self::default_result(sql),
        };

        Ok(result.with_execution_time(Duration::from_millis(1)))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A database client whose every query fails with the same message.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Err(AskDbError::query(self.message.clone()))
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(AskDbError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
