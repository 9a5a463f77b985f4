//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{Column, ColumnInfo, DatabaseClient, QueryResult, Row, Schema, Table, Value};
use crate::error::{AskDbError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum number of connection attempts.
const MAX_CONNECT_ATTEMPTS: u32 = 3;

/// Base delay between connection attempts (doubles each retry).
const CONNECT_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL database client backed by a small connection pool.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Connects to PostgreSQL, retrying transient failures with backoff.
    ///
    /// Only establishing the pool is retried; query execution never is.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        let mut last_error = None;
        let mut delay = Duration::from_millis(CONNECT_BASE_DELAY_MS);

        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            debug!(attempt, "Connecting to PostgreSQL");

            let result = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Connected to {}", config.display_string());
                    return Ok(Self { pool });
                }
                Err(e) => {
                    let transient = is_transient_error(&e);
                    last_error = Some(e);
                    if attempt < MAX_CONNECT_ATTEMPTS && transient {
                        warn!(attempt, ?delay, "Transient connection failure, retrying");
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    } else {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(map_connection_error(e, config)),
            None => Err(AskDbError::connection("No connection attempt was made")),
        }
    }

    async fn fetch_tables(&self) -> Result<Vec<Table>> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT
                table_name::text,
                column_name::text,
                data_type::text,
                is_nullable::text
            FROM information_schema.columns
            WHERE table_schema = 'public'
            ORDER BY table_name, ordinal_position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AskDbError::query(format!("Failed to fetch schema: {e}")))?;

        let mut tables: BTreeMap<String, Vec<Column>> = BTreeMap::new();
        for (table, column, data_type, is_nullable) in rows {
            tables
                .entry(table)
                .or_default()
                .push(Column::new(column, data_type, is_nullable == "YES"));
        }

        Ok(tables
            .into_iter()
            .map(|(name, columns)| Table::new(name, columns))
            .collect())
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(Schema {
            tables: self.fetch_tables().await?,
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let pg_rows = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            AskDbError::query(format!(
                "Query timed out after {QUERY_TIMEOUT_SECS} seconds"
            ))
        })?
        .map_err(|e| AskDbError::query(format_query_error(e)))?;

        let columns = pg_rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let rows = pg_rows
            .iter()
            .map(convert_row)
            .collect::<Result<Vec<Row>>>()?;

        Ok(QueryResult::with_data(columns, rows).with_execution_time(start.elapsed()))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn convert_row(row: &PgRow) -> Result<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes one cell. A type that cannot be decoded is an error, never NULL.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Result<Value> {
    let value = match type_name.to_uppercase().as_str() {
        "BOOL" => decode::<bool>(row, index)?.into(),
        "INT2" => decode::<i16>(row, index)?.map(i64::from).into(),
        "INT4" => decode::<i32>(row, index)?.into(),
        "INT8" => decode::<i64>(row, index)?.into(),
        "FLOAT4" => decode::<f32>(row, index)?.map(f64::from).into(),
        "FLOAT8" => decode::<f64>(row, index)?.into(),
        "BYTEA" => decode::<Vec<u8>>(row, index)?
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        // Exact decimals keep their scale as text ("1234.50").
        "NUMERIC" => text(decode::<Decimal>(row, index)?),
        "DATE" => text(decode::<NaiveDate>(row, index)?),
        "TIME" => text(decode::<NaiveTime>(row, index)?),
        "TIMESTAMP" => text(decode::<NaiveDateTime>(row, index)?),
        "TIMESTAMPTZ" => decode::<DateTime<Utc>>(row, index)?
            .map(|ts| ts.to_rfc3339())
            .into(),
        "UUID" => text(decode::<Uuid>(row, index)?),
        "JSON" | "JSONB" => text(decode::<JsonValue>(row, index)?),
        _ => decode::<String>(row, index)?.into(),
    };
    Ok(value)
}

fn decode<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index).map_err(|e| {
        let column = row.columns().get(index).map(|c| c.name()).unwrap_or("?");
        AskDbError::query(format!("Cannot read column \"{column}\": {e}"))
    })
}

fn text<T: ToString>(value: Option<T>) -> Value {
    value
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}

fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();
    [
        "connection refused",
        "timed out",
        "timeout",
        "temporarily unavailable",
        "connection reset",
        "broken pipe",
    ]
    .iter()
    .any(|needle| error_str.contains(needle))
}

fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> AskDbError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        AskDbError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("authentication failed") {
        let user = config.user.as_deref().unwrap_or("unknown");
        AskDbError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        let database = config.database.as_deref().unwrap_or("unknown");
        AskDbError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        AskDbError::connection(format!("Connection to {host}:{port} timed out."))
    } else {
        AskDbError::connection(error.to_string())
    }
}

/// Extracts the server message plus any DETAIL/HINT lines.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();
    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            message.push_str("\n  DETAIL: ");
            message.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            message.push_str("\n  HINT: ");
            message.push_str(hint);
        }
    }
    message
}
