//! Exporting controller results to disk.

use std::sync::Arc;

use ask_db::db::{ColumnInfo, MockDatabaseClient, QueryResult, Value};
use ask_db::export::{export_to_path, ExportFormat};
use ask_db::query::QueryController;
use ask_db::session::Session;

use super::{ScriptedTranslator, SharedDb};

fn controller(db: MockDatabaseClient) -> QueryController {
    let (translator, _) = ScriptedTranslator::sql("SELECT name, city FROM customers");
    QueryController::new(Box::new(translator), Box::new(SharedDb(Arc::new(db))))
}

fn customers() -> QueryResult {
    QueryResult::with_data(
        vec![ColumnInfo::new("name", "text"), ColumnInfo::new("city", "text")],
        vec![
            vec![Value::from("Ada"), Value::from("London")],
            vec![Value::from("Grace"), Value::Null],
        ],
    )
}

#[tokio::test]
async fn test_csv_export_with_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("customers.csv");
    let controller = controller(MockDatabaseClient::new().with_result("customers", customers()));
    let mut session = Session::new();

    let result = controller.handle(&mut session, "customers").await;
    let rows = export_to_path(&result, &path, ExportFormat::from_path(&path), true).unwrap();

    assert_eq!(rows, 2);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        ",name,city\n0,Ada,London\n1,Grace,\n"
    );
}

#[tokio::test]
async fn test_json_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("customers.json");
    let controller = controller(MockDatabaseClient::new().with_result("customers", customers()));
    let mut session = Session::new();

    let result = controller.handle(&mut session, "customers").await;
    export_to_path(&result, &path, ExportFormat::Json, false).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json[0]["name"], "Ada");
    assert!(json[1]["city"].is_null());
}

#[tokio::test]
async fn test_failed_result_cannot_be_exported() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(MockDatabaseClient::new().with_error("customers", "permission denied"));
    let mut session = Session::new();

    let result = controller.handle(&mut session, "customers").await;

    assert!(export_to_path(&result, &dir.path().join("x.csv"), ExportFormat::Csv, false).is_err());
}
