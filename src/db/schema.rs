//! Database schema description used to ground SQL generation.

use serde::{Deserialize, Serialize};

/// Tables visible to the translator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no tables are known.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    pub fn format_for_prompt(&self) -> String {
        if self.tables.is_empty() {
            return "(schema unavailable)".to_string();
        }

        self.tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(Column::format_for_prompt)
                    .collect::<Vec<_>>()
                    .join("");
                format!("Table: {}\n{}", table.name, columns)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A table and its columns in ordinal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }
}

/// A column definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, is_nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable,
        }
    }

    fn format_for_prompt(&self) -> String {
        if self.is_nullable {
            format!("  - {}: {}\n", self.name, self.data_type)
        } else {
            format!("  - {}: {} (NOT NULL)\n", self.name, self.data_type)
        }
    }
}
