//! ask-db - natural-language questions answered with SQL.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod ledger;
pub mod limit;
pub mod llm;
pub mod logging;
pub mod query;
pub mod render;
pub mod repl;
pub mod session;
