//! Execution adapter.
//!
//! Runs one question through the translator, the limit enforcer and the
//! database, folding every result into an [`ExecutionOutcome`]. Each call
//! translates exactly once and executes at most once; nothing is retried.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::db::DatabaseClient;
use crate::limit::{LimitError, LimitPolicy};
use crate::llm::Translator;

use super::outcome::{ExecutionOutcome, FailureKind};
use super::phase::{PhaseTracker, RequestPhase};

/// Adapter over the translator and database collaborators.
pub struct QueryExecutor<'a> {
    translator: &'a dyn Translator,
    db: &'a dyn DatabaseClient,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(translator: &'a dyn Translator, db: &'a dyn DatabaseClient) -> Self {
        Self { translator, db }
    }

    /// Translates, enforces and executes `question`.
    pub async fn execute(&self, question: &str, policy: &LimitPolicy) -> ExecutionOutcome {
        let mut tracker = PhaseTracker::new();
        self.execute_tracked(question, policy, &mut tracker).await
    }

    /// Like [`execute`](Self::execute), recording phases in `tracker`.
    ///
    /// Leaves the tracker in `Succeeded` or `Failed`.
    pub async fn execute_tracked(
        &self,
        question: &str,
        policy: &LimitPolicy,
        tracker: &mut PhaseTracker,
    ) -> ExecutionOutcome {
        tracker.advance(RequestPhase::Translating);
        let candidate = match self.translator.translate(question).await {
            Ok(sql) => sql,
            Err(e) => {
                warn!(error = %e, "Translation failed");
                tracker.advance(RequestPhase::Failed);
                return ExecutionOutcome::failure("", FailureKind::Translation, e.message());
            }
        };

        tracker.advance(RequestPhase::Enforcing);
        let query_text = match policy.apply(&candidate) {
            Ok(sql) => sql,
            Err(LimitError::EmptyQuery) => {
                warn!("Translator returned an empty query");
                tracker.advance(RequestPhase::Failed);
                return ExecutionOutcome::failure(
                    "",
                    FailureKind::EmptyQuery,
                    LimitError::EmptyQuery.to_string(),
                );
            }
        };
        debug!(
            enforced = policy.enabled,
            max_rows = policy.max_rows,
            rewritten = query_text.trim_end_matches(';') != candidate.trim().trim_end_matches(';'),
            "Query ready for execution"
        );

        tracker.advance(RequestPhase::Executing);
        let start = Instant::now();
        let result = self.db.execute_query(&query_text).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(result) => {
                info!(duration_ms, row_count = result.rows.len(), "Query succeeded");
                tracker.advance(RequestPhase::Succeeded);
                ExecutionOutcome::Success { query_text, result }
            }
            Err(e) => {
                warn!(duration_ms, error = %e, "Query failed");
                tracker.advance(RequestPhase::Failed);
                ExecutionOutcome::failure(query_text, FailureKind::Execution, e.message())
            }
        }
    }
}
