//! Row-limit enforcement for generated SQL.
//!
//! Rewrites a candidate query so the database never returns more than a
//! bounded number of rows. Detection of an existing `LIMIT` or `FETCH FIRST`
//! clause works on SQL tokens rather than raw substrings, so identifiers such
//! as `speed_limit`, quoted names, string literals and comments never count as
//! a limiting clause.

use std::sync::OnceLock;

use regex::Regex;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};
use thiserror::Error;
use tracing::debug;

use crate::error::{AskDbError, Result};

/// Smallest accepted row bound.
pub const MIN_MAX_ROWS: usize = 10;

/// Largest accepted row bound.
pub const MAX_MAX_ROWS: usize = 10_000;

/// Row bound used when none is configured.
pub const DEFAULT_MAX_ROWS: usize = 200;

const TERMINATOR: char = ';';

/// Errors produced by the limit enforcer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LimitError {
    /// The candidate contained nothing but whitespace and terminators.
    #[error("Generated query is empty")]
    EmptyQuery,
}

/// Per-request limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub enabled: bool,
    pub max_rows: usize,
}

impl LimitPolicy {
    /// Creates a policy, rejecting bounds outside `MIN_MAX_ROWS..=MAX_MAX_ROWS`.
    pub fn new(enabled: bool, max_rows: usize) -> Result<Self> {
        validate_max_rows(max_rows)?;
        Ok(Self { enabled, max_rows })
    }

    /// A policy that leaves queries untouched apart from terminator normalization.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Applies this policy to a query.
    pub fn apply(&self, query_text: &str) -> std::result::Result<String, LimitError> {
        enforce(query_text, self.max_rows, self.enabled)
    }
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

/// Checks that a row bound is inside the accepted range.
pub fn validate_max_rows(max_rows: usize) -> Result<()> {
    if (MIN_MAX_ROWS..=MAX_MAX_ROWS).contains(&max_rows) {
        Ok(())
    } else {
        Err(AskDbError::config(format!(
            "max_rows must be between {MIN_MAX_ROWS} and {MAX_MAX_ROWS}, got {max_rows}"
        )))
    }
}

/// Enforces a maximum row count on a query.
///
/// The result always ends with exactly one `;`. When `enabled` is false only
/// terminator normalization is applied. When enabled and the query has no
/// `LIMIT` clause, ` LIMIT {max_rows}` is appended; an existing bound is
/// never overridden. Applying the function to its own output is a no-op.
pub fn enforce(
    query_text: &str,
    max_rows: usize,
    enabled: bool,
) -> std::result::Result<String, LimitError> {
    let body = strip_terminators(query_text);
    if body.is_empty() {
        return Err(LimitError::EmptyQuery);
    }

    if !enabled {
        return Ok(format!("{body}{TERMINATOR}"));
    }

    let scan = scan(body);
    if scan.has_limit {
        debug!("Query already carries a LIMIT clause; leaving bound untouched");
        return Ok(format!("{body}{TERMINATOR}"));
    }

    // A clause appended after a `--` comment would be commented out.
    let separator = if scan.ends_in_line_comment { "\n" } else { " " };
    debug!(max_rows, "Appending LIMIT clause");
    Ok(format!("{body}{separator}LIMIT {max_rows}{TERMINATOR}"))
}

/// Normalizes a query to end with exactly one terminator.
///
/// Returns `";"` for an empty input; callers that must reject empty queries
/// should use [`enforce`] instead.
pub fn normalize(query_text: &str) -> String {
    format!("{}{TERMINATOR}", strip_terminators(query_text))
}

/// Returns true if the query already bounds its rows with `LIMIT` or
/// `FETCH FIRST`/`FETCH NEXT`, matched as standalone keywords.
pub fn has_limit_clause(query_text: &str) -> bool {
    scan(strip_terminators(query_text)).has_limit
}

fn strip_terminators(query_text: &str) -> &str {
    query_text.trim_end_matches(|c: char| c == TERMINATOR || c.is_whitespace()).trim_start()
}

struct Scan {
    has_limit: bool,
    ends_in_line_comment: bool,
}

fn scan(body: &str) -> Scan {
    let dialect = PostgreSqlDialect {};
    match Tokenizer::new(&dialect, body).tokenize() {
        Ok(tokens) => Scan {
            has_limit: has_row_bound(&tokens),
            ends_in_line_comment: matches!(
                tokens.iter().rev().find(|t| !is_blank(t)),
                Some(Token::Whitespace(Whitespace::SingleLineComment { .. }))
            ),
        },
        Err(e) => {
            debug!(error = %e, "Tokenizer rejected query; falling back to word-boundary match");
            Scan {
                has_limit: limit_word_regex().is_match(body),
                ends_in_line_comment: false,
            }
        }
    }
}

/// True if the tokens contain `LIMIT` or `FETCH FIRST`/`FETCH NEXT`.
fn has_row_bound(tokens: &[Token]) -> bool {
    let words: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect();

    words.iter().enumerate().any(|(i, token)| {
        is_keyword(token, Keyword::LIMIT)
            || (is_keyword(token, Keyword::FETCH)
                && words.get(i + 1).is_some_and(|next| {
                    is_keyword(next, Keyword::FIRST) || is_keyword(next, Keyword::NEXT)
                }))
    })
}

fn is_keyword(token: &Token, keyword: Keyword) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.keyword == keyword)
}

fn is_blank(token: &Token) -> bool {
    matches!(
        token,
        Token::Whitespace(Whitespace::Space | Whitespace::Newline | Whitespace::Tab)
    )
}

fn limit_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(limit|fetch\s+(first|next))\b").expect("static pattern is valid"))
}
