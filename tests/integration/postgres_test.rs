//! PostgreSQL integration tests.
//!
//! Skipped unless DATABASE_URL points at a reachable database.

use ask_db::config::ConnectionConfig;
use ask_db::db::{DatabaseClient, PostgresClient, Value};
use ask_db::llm::{LlmTranslator, MockLlmClient};
use ask_db::query::{FailureKind, QueryController};
use ask_db::session::Session;

async fn get_test_client() -> Option<PostgresClient> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    PostgresClient::connect(&config).await.ok()
}

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT 1 AS num, 'hello' AS greeting, NULL::text AS nothing")
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["num", "greeting", "nothing"]);
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][1], Value::String("hello".to_string()));
    assert!(result.rows[0][2].is_null());

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_numeric_and_temporal_columns_are_decoded() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query(
            "SELECT dept, SUM(budget) AS total, MIN(approved) AS first_approved \
             FROM (VALUES ('ops', 1200.50::numeric(12,2), DATE '2024-02-01'), \
                          ('ops', 300.25::numeric(12,2), DATE '2024-01-15')) \
                  AS budgets(dept, budget, approved) \
             GROUP BY dept LIMIT 200;",
        )
        .await
        .unwrap();

    assert_eq!(
        result.rows[0],
        vec![
            Value::String("ops".to_string()),
            Value::String("1500.75".to_string()),
            Value::String("2024-01-15".to_string()),
        ]
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_uuid_json_and_timestamp_columns_are_decoded() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query(
            "SELECT '6f1c2b9e-3d4a-4b8e-9f00-0123456789ab'::uuid AS id, \
                    '{\"a\": 1}'::jsonb AS doc, \
                    TIMESTAMP '2024-03-01 12:30:00' AS at, \
                    NULL::numeric AS missing",
        )
        .await
        .unwrap();

    let row = &result.rows[0];
    assert_eq!(
        row[0],
        Value::String("6f1c2b9e-3d4a-4b8e-9f00-0123456789ab".to_string())
    );
    assert_eq!(row[1], Value::String(r#"{"a":1}"#.to_string()));
    assert_eq!(row[2], Value::String("2024-03-01 12:30:00".to_string()));
    assert!(row[3].is_null());

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_syntax_error_is_reported() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = client.execute_query("SELEC 1").await.unwrap_err();
    assert!(err.to_string().to_lowercase().contains("syntax error"));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_limit_bounds_rows_end_to_end() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let translator = LlmTranslator::new(Box::new(
        MockLlmClient::new().with_sql("series", "SELECT n FROM generate_series(1, 500) AS n"),
    ));
    let controller = QueryController::new(Box::new(translator), Box::new(client));
    let mut session = Session::new();

    let result = controller.handle(&mut session, "a long series").await;

    assert!(result.is_success(), "{:?}", result.error_message());
    assert_eq!(result.row_count(), 200);
    assert!(result.query_text().ends_with("LIMIT 200;"));

    controller.database().close().await.unwrap();
}

#[tokio::test]
async fn test_database_error_keeps_enforced_query() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let translator = LlmTranslator::new(Box::new(
        MockLlmClient::new().with_sql("missing", "SELECT * FROM table_that_does_not_exist"),
    ));
    let controller = QueryController::new(Box::new(translator), Box::new(client));
    let mut session = Session::new();

    let result = controller.handle(&mut session, "missing table").await;

    assert_eq!(result.failure_kind(), Some(FailureKind::Execution));
    assert_eq!(
        result.query_text(),
        "SELECT * FROM table_that_does_not_exist LIMIT 200;"
    );
    assert!(result.error_message().unwrap().contains("does not exist"));

    controller.database().close().await.unwrap();
}
