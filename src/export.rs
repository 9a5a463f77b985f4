//! Result export.
//!
//! Writes a successful result set as CSV or JSON. CSV follows RFC 4180
//! quoting; NULL becomes an empty field.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::db::{QueryResult, Value};
use crate::error::{AskDbError, Result};
use crate::query::RenderableResult;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    /// Infers the format from a file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AskDbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(AskDbError::config(format!(
                "Invalid export format: {s}. Expected: csv or json"
            ))),
        }
    }
}

/// Writes `result` as CSV, optionally prefixed by a 0-based index column.
pub fn write_csv<W: Write>(
    result: &QueryResult,
    writer: &mut W,
    include_index: bool,
) -> Result<()> {
    let mut header: Vec<String> = Vec::with_capacity(result.columns.len() + 1);
    if include_index {
        header.push(String::new());
    }
    header.extend(result.columns.iter().map(|c| escape_csv_field(&c.name)));
    writeln!(writer, "{}", header.join(","))?;

    for (index, row) in result.rows.iter().enumerate() {
        let mut fields: Vec<String> = Vec::with_capacity(row.len() + 1);
        if include_index {
            fields.push(index.to_string());
        }
        fields.extend(row.iter().map(csv_field));
        writeln!(writer, "{}", fields.join(","))?;
    }

    writer.flush()?;
    Ok(())
}

/// Converts `result` to a JSON array of objects keyed by column name.
pub fn to_json(result: &QueryResult) -> serde_json::Value {
    let rows = result
        .rows
        .iter()
        .map(|row| {
            let object = result
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| (column.name.clone(), value.to_json()))
                .collect::<serde_json::Map<_, _>>();
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::Value::Array(rows)
}

/// Writes the rows of a successful request to `path`.
///
/// Returns the number of data rows written.
pub fn export_to_path(
    rendered: &RenderableResult,
    path: &Path,
    format: ExportFormat,
    include_index: bool,
) -> Result<usize> {
    let result = rendered
        .result()
        .ok_or_else(|| AskDbError::query("No result to export: the last request failed"))?;

    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ExportFormat::Csv => write_csv(result, &mut writer, include_index)?,
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &to_json(result))
                .map_err(|e| AskDbError::internal(format!("Failed to encode JSON: {e}")))?;
            writer.flush()?;
        }
    }

    tracing::info!(path = %path.display(), rows = result.rows.len(), ?format, "Exported result");
    Ok(result.rows.len())
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => escape_csv_field(&other.to_display_string()),
    }
}

fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
