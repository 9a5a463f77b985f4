//! End-to-end request flow through the controller with mock collaborators.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use ask_db::db::{ColumnInfo, MockDatabaseClient, QueryResult, Value};
use ask_db::error::AskDbError;
use ask_db::limit::LimitPolicy;
use ask_db::query::{ExecutionOutcome, FailureKind, QueryController};
use ask_db::session::Session;
use pretty_assertions::assert_eq;

use super::{ScriptedTranslator, SharedDb};

fn budget_rows(n: usize) -> QueryResult {
    QueryResult::with_data(
        vec![ColumnInfo::new("dept", "text"), ColumnInfo::new("sum", "numeric")],
        (0..n)
            .map(|i| {
                vec![
                    Value::String(format!("dept-{i}")),
                    Value::String(format!("{}.00", 1000 * i)),
                ]
            })
            .collect(),
    )
}

#[tokio::test]
async fn test_budget_by_department() {
    let (translator, translations) = ScriptedTranslator::sql(
        "SELECT dept, SUM(budget) FROM budgets WHERE year=2024 GROUP BY dept",
    );
    let db = Arc::new(MockDatabaseClient::new().with_result("budgets", budget_rows(5)));
    let controller = QueryController::new(Box::new(translator), Box::new(SharedDb(db.clone())));
    let mut session = Session::new();

    let result = controller
        .handle_with(
            &mut session,
            "Total budget for 2024 by department",
            &LimitPolicy::new(true, 200).unwrap(),
        )
        .await;

    assert!(result.is_success());
    assert!(result.query_text().ends_with("LIMIT 200;"));
    assert_eq!(result.row_count(), 5);
    assert_eq!(db.executed(), vec![result.query_text().to_string()]);
    assert_eq!(translations.load(Ordering::SeqCst), 1);

    let entry = session.ledger().latest().unwrap();
    assert_eq!(entry.question(), "Total budget for 2024 by department");
    assert_eq!(entry.row_count(), 5);
    assert_eq!(entry.error_message(), None);
}

#[tokio::test]
async fn test_empty_question_calls_nothing() {
    let (translator, translations) = ScriptedTranslator::sql("SELECT 1");
    let db = Arc::new(MockDatabaseClient::new());
    let controller = QueryController::new(Box::new(translator), Box::new(SharedDb(db.clone())));
    let mut session = Session::new();

    let result = controller.handle(&mut session, "").await;

    assert_eq!(result.failure_kind(), Some(FailureKind::EmptyQuestion));
    assert_eq!(translations.load(Ordering::SeqCst), 0);
    assert_eq!(db.call_count(), 0);
    assert!(session.ledger().is_empty());
}

#[tokio::test]
async fn test_translation_failure_is_reported_and_logged() {
    let (translator, _) = ScriptedTranslator::failing("ambiguous column reference");
    let db = Arc::new(MockDatabaseClient::new());
    let controller = QueryController::new(Box::new(translator), Box::new(SharedDb(db.clone())));
    let mut session = Session::new();

    let result = controller.handle(&mut session, "which dept spent most").await;

    assert_eq!(
        result.outcome,
        ExecutionOutcome::failure("", FailureKind::Translation, "ambiguous column reference")
    );
    assert_eq!(db.call_count(), 0);

    let entry = session.ledger().latest().unwrap();
    assert_eq!(entry.query_text(), "");
    assert_eq!(entry.error_message(), Some("ambiguous column reference"));
}

#[tokio::test]
async fn test_existing_limit_is_kept() {
    let (translator, _) = ScriptedTranslator::sql("SELECT * FROM orders ORDER BY total DESC LIMIT 50");
    let db = Arc::new(MockDatabaseClient::new());
    let controller = QueryController::new(Box::new(translator), Box::new(SharedDb(db.clone())));
    let mut session = Session::new();

    let result = controller.handle(&mut session, "top orders").await;

    assert_eq!(
        result.query_text(),
        "SELECT * FROM orders ORDER BY total DESC LIMIT 50;"
    );
    assert!(!result.query_text().contains("200"));
}

#[tokio::test]
async fn test_database_error_carries_enforced_query() {
    let (translator, _) = ScriptedTranslator::sql("SELEC dept FROM budgets");
    let db = Arc::new(
        MockDatabaseClient::new().with_error("budgets", "syntax error at or near \"SELEC\""),
    );
    let controller = QueryController::new(Box::new(translator), Box::new(SharedDb(db.clone())));
    let mut session = Session::new();

    let result = controller.handle(&mut session, "departments").await;

    assert_eq!(
        result.outcome,
        ExecutionOutcome::failure(
            "SELEC dept FROM budgets LIMIT 200;",
            FailureKind::Execution,
            "syntax error at or near \"SELEC\""
        )
    );

    let entry = session.ledger().latest().unwrap();
    assert_eq!(entry.query_text(), "SELEC dept FROM budgets LIMIT 200;");
    assert_eq!(entry.row_count(), 0);
}

#[tokio::test]
async fn test_empty_translation_is_not_executed() {
    let (translator, _) = ScriptedTranslator::sql("  ;; ");
    let db = Arc::new(MockDatabaseClient::new());
    let controller = QueryController::new(Box::new(translator), Box::new(SharedDb(db.clone())));
    let mut session = Session::new();

    let result = controller.handle(&mut session, "nothing").await;

    let kind = result.failure_kind().unwrap();
    assert_eq!(kind, FailureKind::EmptyQuery);
    assert!(kind.is_execution_class());
    assert_eq!(db.call_count(), 0);
    assert_eq!(session.ledger().len(), 1);
}

#[tokio::test]
async fn test_ledger_is_most_recent_first() {
    let (translator, translations) = ScriptedTranslator::sql("SELECT 1");
    let db = Arc::new(MockDatabaseClient::new());
    let controller = QueryController::new(Box::new(translator), Box::new(SharedDb(db)));
    let mut session = Session::new();

    for question in ["q1", "q2", "q3"] {
        controller.handle(&mut session, question).await;
    }

    let questions: Vec<_> = session.ledger().recent(3).iter().map(|e| e.question()).collect();
    assert_eq!(questions, vec!["q3", "q2", "q1"]);
    assert_eq!(translations.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_sessions_keep_separate_ledgers() {
    let (translator, _) = ScriptedTranslator::sql("SELECT 1");
    let controller = QueryController::new(
        Box::new(translator),
        Box::new(SharedDb(Arc::new(MockDatabaseClient::new()))),
    );
    let mut alice = Session::new();
    let mut bob = Session::new();

    controller.handle(&mut alice, "first").await;
    controller.handle(&mut alice, "second").await;
    controller.handle(&mut bob, "only").await;

    assert_eq!(alice.ledger().len(), 2);
    assert_eq!(bob.ledger().len(), 1);
    assert_eq!(bob.ledger().latest().unwrap().question(), "only");
}

#[tokio::test]
async fn test_database_closed_when_work_fails() {
    let (translator, _) = ScriptedTranslator::sql("SELECT 1");
    let db = Arc::new(MockDatabaseClient::new());
    let controller = QueryController::new(Box::new(translator), Box::new(SharedDb(db.clone())));

    let result: Result<(), AskDbError> = controller
        .close_after(async {
            Err(AskDbError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin closed",
            )))
        })
        .await;

    assert_eq!(result.unwrap_err().message(), "stdin closed");
    assert!(db.is_closed());
}

#[tokio::test]
async fn test_database_closed_after_successful_work() {
    let (translator, _) = ScriptedTranslator::sql("SELECT 1");
    let db = Arc::new(MockDatabaseClient::new());
    let controller = QueryController::new(Box::new(translator), Box::new(SharedDb(db.clone())));
    let mut session = Session::new();

    let rows = controller
        .close_after(async {
            let result = controller.handle(&mut session, "one").await;
            Ok::<_, AskDbError>(result.row_count())
        })
        .await
        .unwrap();

    assert_eq!(rows, 1);
    assert!(db.is_closed());
}

#[tokio::test]
async fn test_disabled_policy_passes_query_through() {
    let (translator, _) = ScriptedTranslator::sql("SELECT * FROM users");
    let db = Arc::new(MockDatabaseClient::new());
    let controller = QueryController::new(Box::new(translator), Box::new(SharedDb(db.clone())));
    let mut session = Session::new();

    let result = controller
        .handle_with(&mut session, "users", &LimitPolicy::disabled())
        .await;

    assert_eq!(result.query_text(), "SELECT * FROM users;");
    assert_eq!(db.executed(), vec!["SELECT * FROM users;"]);
}
