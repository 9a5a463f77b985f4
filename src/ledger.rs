//! Interaction ledger.
//!
//! An append-only, most-recent-first record of the questions asked in a
//! session, the SQL that was actually sent to the database, and how each
//! request ended. Entries are never edited; the only removal is oldest-first
//! eviction once an optional capacity is reached.

use std::collections::VecDeque;

use serde::Serialize;

use crate::query::ExecutionOutcome;

/// Capacity used when none is configured.
pub const DEFAULT_LEDGER_CAPACITY: usize = 1000;

/// One completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    question: String,
    query_text: String,
    row_count: usize,
    error_message: Option<String>,
}

impl LedgerEntry {
    pub fn new(
        question: impl Into<String>,
        query_text: impl Into<String>,
        row_count: usize,
        error_message: Option<String>,
    ) -> Self {
        Self {
            question: question.into(),
            query_text: query_text.into(),
            row_count,
            error_message,
        }
    }

    /// Records an outcome: executed text, row count (0 on failure) and error.
    pub fn from_outcome(question: impl Into<String>, outcome: &ExecutionOutcome) -> Self {
        match outcome {
            ExecutionOutcome::Success { query_text, .. } => {
                Self::new(question, query_text.clone(), outcome.row_count(), None)
            }
            ExecutionOutcome::Failure {
                query_text,
                error_message,
                ..
            } => Self::new(question, query_text.clone(), 0, Some(error_message.clone())),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// SQL sent to the database, or empty if none was.
    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Most-recent-first record of ledger entries.
#[derive(Debug, Clone)]
pub struct Ledger {
    entries: VecDeque<LedgerEntry>,
    capacity: Option<usize>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::with_capacity(Some(DEFAULT_LEDGER_CAPACITY))
    }
}

impl Ledger {
    /// Creates an empty ledger with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty ledger that never evicts.
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Creates an empty ledger; `None` means unbounded.
    ///
    /// A capacity of zero is treated as one so the newest entry is always kept.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.map(|c| c.max(1)),
        }
    }

    /// Inserts an entry as the most recent, evicting the oldest over capacity.
    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push_front(entry);
        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity {
                if let Some(evicted) = self.entries.pop_back() {
                    tracing::trace!(question = evicted.question(), "Evicted oldest ledger entry");
                }
            }
        }
    }

    /// Returns up to `n` entries, most recent first.
    pub fn recent(&self, n: usize) -> Vec<&LedgerEntry> {
        self.entries.iter().take(n).collect()
    }

    /// Returns the most recent entry.
    pub fn latest(&self) -> Option<&LedgerEntry> {
        self.entries.front()
    }

    /// Iterates over all entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, QueryResult, Value};
    use crate::query::FailureKind;

    fn entry(n: usize) -> LedgerEntry {
        LedgerEntry::new(format!("q{n}"), format!("SELECT {n};"), n, None)
    }

    #[test]
    fn test_recent_is_most_recent_first() {
        let mut ledger = Ledger::new();
        for n in 1..=3 {
            ledger.append(entry(n));
        }

        let questions: Vec<_> = ledger.recent(3).iter().map(|e| e.question()).collect();
        assert_eq!(questions, vec!["q3", "q2", "q1"]);
    }

    #[test]
    fn test_recent_truncates_silently() {
        let mut ledger = Ledger::new();
        ledger.append(entry(1));

        assert_eq!(ledger.recent(10).len(), 1);
        assert!(ledger.recent(0).is_empty());
        assert!(Ledger::new().recent(5).is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut ledger = Ledger::with_capacity(Some(2));
        for n in 1..=4 {
            ledger.append(entry(n));
        }

        assert_eq!(ledger.len(), 2);
        let questions: Vec<_> = ledger.iter().map(|e| e.question()).collect();
        assert_eq!(questions, vec!["q4", "q3"]);
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let mut ledger = Ledger::unbounded();
        for n in 0..1500 {
            ledger.append(entry(n));
        }
        assert_eq!(ledger.len(), 1500);
        assert_eq!(ledger.capacity(), None);
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(Ledger::new().capacity(), Some(DEFAULT_LEDGER_CAPACITY));
        assert_eq!(Ledger::with_capacity(Some(0)).capacity(), Some(1));
    }

    #[test]
    fn test_entry_from_success() {
        let outcome = ExecutionOutcome::Success {
            query_text: "SELECT 1 LIMIT 200;".to_string(),
            result: QueryResult::with_data(
                vec![ColumnInfo::new("n", "int4")],
                vec![vec![Value::Int(1)]],
            ),
        };

        let entry = LedgerEntry::from_outcome("one", &outcome);
        assert_eq!(entry.query_text(), "SELECT 1 LIMIT 200;");
        assert_eq!(entry.row_count(), 1);
        assert_eq!(entry.error_message(), None);
        assert!(!entry.is_error());
    }

    #[test]
    fn test_entry_counts_rows_actually_returned() {
        let mut result = QueryResult::with_data(
            vec![ColumnInfo::new("n", "int4")],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        );
        result.row_count = 7;
        let outcome = ExecutionOutcome::Success {
            query_text: "SELECT n FROM t LIMIT 200;".to_string(),
            result,
        };

        let entry = LedgerEntry::from_outcome("two rows", &outcome);
        assert_eq!(entry.row_count(), 2);
        assert_eq!(entry.row_count(), outcome.row_count());
    }

    #[test]
    fn test_entry_from_failure() {
        let outcome = ExecutionOutcome::Failure {
            query_text: String::new(),
            kind: FailureKind::Translation,
            error_message: "ambiguous column reference".to_string(),
        };

        let entry = LedgerEntry::from_outcome("which dept?", &outcome);
        assert_eq!(entry.query_text(), "");
        assert_eq!(entry.row_count(), 0);
        assert_eq!(entry.error_message(), Some("ambiguous column reference"));
    }

    #[test]
    fn test_entry_serializes_for_export() {
        let json = serde_json::to_value(entry(7)).unwrap();
        assert_eq!(json["question"], "q7");
        assert_eq!(json["row_count"], 7);
        assert!(json["error_message"].is_null());
    }
}
