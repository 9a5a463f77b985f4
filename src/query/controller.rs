//! Query controller.
//!
//! Owns the flow of a single request from question to ledger entry. The
//! session is borrowed mutably for the whole request, so one session never
//! has two requests in flight, and the ledger is only touched after the
//! outcome is final.

use std::future::Future;
use std::time::Instant;

use tracing::{info, info_span, Instrument};

use crate::db::DatabaseClient;
use crate::error::AskDbError;
use crate::ledger::LedgerEntry;
use crate::limit::LimitPolicy;
use crate::llm::Translator;
use crate::session::Session;

use super::executor::QueryExecutor;
use super::outcome::{ExecutionOutcome, FailureKind, RenderableResult};
use super::phase::{PhaseTracker, RequestPhase};

const EMPTY_QUESTION_MESSAGE: &str = "Please enter a question.";

/// Orchestrates translate → enforce → execute → log for each request.
pub struct QueryController {
    translator: Box<dyn Translator>,
    db: Box<dyn DatabaseClient>,
}

impl QueryController {
    pub fn new(translator: Box<dyn Translator>, db: Box<dyn DatabaseClient>) -> Self {
        Self { translator, db }
    }

    /// Handles a question using the session's own limit policy.
    pub async fn handle(&self, session: &mut Session, question: &str) -> RenderableResult {
        let policy = session.settings().policy;
        self.handle_with(session, question, &policy).await
    }

    /// Handles a question with an explicit limit policy.
    ///
    /// An empty question returns an `EmptyQuestion` failure without calling
    /// any collaborator and without touching the ledger. Every other outcome,
    /// success or failure, is appended to the ledger before returning.
    pub async fn handle_with(
        &self,
        session: &mut Session,
        question: &str,
        policy: &LimitPolicy,
    ) -> RenderableResult {
        let start = Instant::now();
        let mut tracker = PhaseTracker::new();
        let question = question.trim();

        if question.is_empty() {
            tracker.advance(RequestPhase::Failed);
            return RenderableResult {
                question: String::new(),
                outcome: ExecutionOutcome::failure(
                    "",
                    FailureKind::EmptyQuestion,
                    EMPTY_QUESTION_MESSAGE,
                ),
                elapsed: start.elapsed(),
            };
        }

        let span = info_span!("request", question_len = question.len());
        let outcome = QueryExecutor::new(self.translator.as_ref(), self.db.as_ref())
            .execute_tracked(question, policy, &mut tracker)
            .instrument(span)
            .await;

        session
            .ledger_mut()
            .append(LedgerEntry::from_outcome(question, &outcome));
        tracker.advance(RequestPhase::Logged);

        let elapsed = start.elapsed();
        info!(
            success = outcome.is_success(),
            row_count = outcome.row_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            ledger_len = session.ledger().len(),
            "Request complete"
        );

        RenderableResult {
            question: question.to_string(),
            outcome,
            elapsed,
        }
    }

    /// Database used by this controller.
    pub fn database(&self) -> &dyn DatabaseClient {
        self.db.as_ref()
    }

    /// Awaits `work`, then closes the database even if `work` failed.
    ///
    /// The error from `work` wins over a close error.
    pub async fn close_after<T, E>(
        &self,
        work: impl Future<Output = Result<T, E>>,
    ) -> Result<T, E>
    where
        E: From<AskDbError>,
    {
        let outcome = work.await;
        let closed = self.db.close().await;
        let value = outcome?;
        closed?;
        Ok(value)
    }
}
