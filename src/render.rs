//! Plain-text rendering for the line-oriented front end.
//!
//! Renders result sets as boxed tables with auto-sized columns, plus the
//! status lines and ledger history the REPL prints.

use crate::db::{QueryResult, Value};
use crate::ledger::LedgerEntry;
use crate::query::RenderableResult;

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Renders a result set as a boxed table.
pub struct ResultTable<'a> {
    result: &'a QueryResult,
}

impl<'a> ResultTable<'a> {
    pub fn new(result: &'a QueryResult) -> Self {
        Self { result }
    }

    /// Calculates the width of each column from its header and values.
    fn calculate_column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .result
            .columns
            .iter()
            .map(|col| col.name.chars().count().max(MIN_COLUMN_WIDTH))
            .collect();

        for row in &self.result.rows {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.to_display_string().chars().count());
            }
        }

        widths.into_iter().map(|w| w.min(MAX_COLUMN_WIDTH)).collect()
    }

    /// Truncates a string to `max_width` characters, adding an ellipsis if needed.
    fn truncate(s: &str, max_width: usize) -> String {
        if s.chars().count() <= max_width {
            s.to_string()
        } else if max_width <= 3 {
            s.chars().take(max_width).collect()
        } else {
            let head: String = s.chars().take(max_width - 3).collect();
            format!("{head}...")
        }
    }

    pub fn render_to_lines(&self) -> Vec<String> {
        if self.result.columns.is_empty() {
            return vec!["(empty result)".to_string()];
        }

        let widths = self.calculate_column_widths();
        let mut lines = Vec::with_capacity(self.result.rows.len() + 4);

        lines.push(Self::render_border(&widths, '┌', '┬', '┐'));
        let names: Vec<String> = self.result.columns.iter().map(|c| c.name.clone()).collect();
        lines.push(Self::render_row(names.iter().map(String::as_str), &widths));
        lines.push(Self::render_border(&widths, '├', '┼', '┤'));

        for row in &self.result.rows {
            let cells: Vec<String> = row.iter().map(display_cell).collect();
            lines.push(Self::render_row(cells.iter().map(String::as_str), &widths));
        }

        lines.push(Self::render_border(&widths, '└', '┴', '┘'));
        lines
    }

    fn render_border(widths: &[usize], left: char, mid: char, right: char) -> String {
        let segments: Vec<String> = widths.iter().map(|&w| "─".repeat(w + 2)).collect();
        format!("{left}{}{right}", segments.join(&mid.to_string()))
    }

    fn render_row<'b>(cells: impl Iterator<Item = &'b str>, widths: &[usize]) -> String {
        let mut line = String::from("│");
        for (cell, &width) in cells.zip(widths) {
            let text = Self::truncate(cell, width);
            line.push_str(&format!(" {text:width$} │"));
        }
        line
    }
}

fn display_cell(value: &Value) -> String {
    value.to_display_string()
}

/// One-line summary of how a request ended.
pub fn summary_line(rendered: &RenderableResult) -> String {
    match rendered.error_message() {
        None => {
            let n = rendered.row_count();
            format!(
                "Returned {n} row{} ({}ms)",
                if n == 1 { "" } else { "s" },
                rendered.elapsed.as_millis()
            )
        }
        Some(message) => match rendered.failure_kind() {
            Some(kind) => format!("{kind}: {message}"),
            None => message.to_string(),
        },
    }
}

/// Renders a full request: SQL, status and table.
///
/// With `show_sql_first` the SQL is printed before the status line;
/// otherwise it follows the table.
pub fn render_result(rendered: &RenderableResult, show_sql_first: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let sql = rendered.query_text();
    let sql_block = || -> Vec<String> {
        if sql.is_empty() {
            Vec::new()
        } else {
            std::iter::once("SQL:".to_string())
                .chain(sql.lines().map(|l| format!("  {l}")))
                .collect()
        }
    };

    if show_sql_first {
        lines.extend(sql_block());
    }

    lines.push(summary_line(rendered));
    if let Some(result) = rendered.result() {
        lines.extend(ResultTable::new(result).render_to_lines());
    }

    if !show_sql_first {
        lines.extend(sql_block());
    }
    lines
}

/// Renders ledger entries, most recent first.
pub fn render_history(entries: &[&LedgerEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No queries yet.".to_string()];
    }

    let mut lines = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let status = match entry.error_message() {
            Some(err) => format!("error: {err}"),
            None => format!("{} rows", entry.row_count()),
        };
        lines.push(format!("{:>3}. {} [{}]", i + 1, entry.question(), status));
        if !entry.query_text().is_empty() {
            lines.push(format!("     {}", entry.query_text().replace('\n', " ")));
        }
    }
    lines
}
