//! Integration tests for ask-db.

pub mod controller_test;
pub mod export_test;
pub mod limit_test;
pub mod postgres_test;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ask_db::db::{DatabaseClient, MockDatabaseClient, QueryResult, Schema};
use ask_db::error::{AskDbError, Result};
use ask_db::llm::Translator;
use async_trait::async_trait;

/// Translator returning one fixed reply and counting calls.
pub struct ScriptedTranslator {
    reply: std::result::Result<String, String>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedTranslator {
    pub fn sql(sql: &str) -> (Self, Arc<AtomicUsize>) {
        Self::build(Ok(sql.to_string()))
    }

    pub fn failing(message: &str) -> (Self, Arc<AtomicUsize>) {
        Self::build(Err(message.to_string()))
    }

    fn build(reply: std::result::Result<String, String>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                reply,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, _question: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(AskDbError::llm)
    }
}

/// Mock database the test keeps a handle to after giving it to a controller.
pub struct SharedDb(pub Arc<MockDatabaseClient>);

#[async_trait]
impl DatabaseClient for SharedDb {
    async fn introspect_schema(&self) -> Result<Schema> {
        self.0.introspect_schema().await
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.0.execute_query(sql).await
    }

    async fn close(&self) -> Result<()> {
        self.0.close().await
    }
}
