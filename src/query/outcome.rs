//! Outcome types shared by the executor, controller and presentation.

use std::fmt;
use std::time::Duration;

use crate::db::{QueryResult, Row};

/// Why a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No question text was provided; nothing was called.
    EmptyQuestion,
    /// The translator could not produce a query.
    Translation,
    /// The translator produced an empty query.
    EmptyQuery,
    /// The database rejected or failed the query.
    Execution,
}

impl FailureKind {
    /// True for failures reported in the execution class (including empty queries).
    pub fn is_execution_class(&self) -> bool {
        matches!(self, Self::Execution | Self::EmptyQuery)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuestion => write!(f, "Empty question"),
            Self::Translation => write!(f, "Translation failed"),
            Self::EmptyQuery => write!(f, "Empty query"),
            Self::Execution => write!(f, "Execution failed"),
        }
    }
}

/// Result of one execution attempt.
///
/// `query_text` is always the post-enforcement text, i.e. what the database
/// received (or would have received).
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Success {
        query_text: String,
        result: QueryResult,
    },
    Failure {
        /// Empty when no query was produced.
        query_text: String,
        kind: FailureKind,
        error_message: String,
    },
}

impl ExecutionOutcome {
    pub fn failure(
        query_text: impl Into<String>,
        kind: FailureKind,
        error_message: impl Into<String>,
    ) -> Self {
        Self::Failure {
            query_text: query_text.into(),
            kind,
            error_message: error_message.into(),
        }
    }

    pub fn query_text(&self) -> &str {
        match self {
            Self::Success { query_text, .. } | Self::Failure { query_text, .. } => query_text,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Rows returned; 0 on failure.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Success { result, .. } => result.rows.len(),
            Self::Failure { .. } => 0,
        }
    }
}

/// Everything the presentation layer needs to show one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableResult {
    pub question: String,
    pub outcome: ExecutionOutcome,
    /// Wall time for the whole request.
    pub elapsed: Duration,
}

impl RenderableResult {
    pub fn query_text(&self) -> &str {
        self.outcome.query_text()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn row_count(&self) -> usize {
        self.outcome.row_count()
    }

    pub fn result(&self) -> Option<&QueryResult> {
        match &self.outcome {
            ExecutionOutcome::Success { result, .. } => Some(result),
            ExecutionOutcome::Failure { .. } => None,
        }
    }

    pub fn rows(&self) -> Option<&[Row]> {
        self.result().map(|r| r.rows.as_slice())
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ExecutionOutcome::Failure { error_message, .. } => Some(error_message),
            ExecutionOutcome::Success { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            ExecutionOutcome::Failure { kind, .. } => Some(*kind),
            ExecutionOutcome::Success { .. } => None,
        }
    }
}
