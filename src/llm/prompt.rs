//! Prompt construction for SQL generation.

use crate::db::Schema;
use crate::llm::types::Message;

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You translate questions about a PostgreSQL database into a single SQL query.

DATABASE SCHEMA:
{schema}

INSTRUCTIONS:
- Generate exactly one valid PostgreSQL SELECT statement
- Only reference tables and columns from the schema
- Prefer explicit column lists over SELECT *
- If the question cannot be answered from the schema, explain why and do not emit SQL

OUTPUT FORMAT:
Return the SQL query wrapped in a ```sql code block."#;

/// Builds the system prompt with the schema description injected.
pub fn build_system_prompt(schema: &Schema) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{schema}", &schema.format_for_prompt())
}

/// Builds the message list for translating one question.
///
/// Each request is independent; earlier questions are not replayed.
pub fn build_messages(schema: &Schema, question: &str) -> Vec<Message> {
    vec![
        Message::system(build_system_prompt(schema)),
        Message::user(question.trim()),
    ]
}
