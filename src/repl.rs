//! Line-oriented front end.
//!
//! Reads one line at a time. Lines starting with `/` are commands; anything
//! else is a question handed to the [`QueryController`].

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::error::Result;
use crate::export::{export_to_path, ExportFormat};
use crate::limit::LimitPolicy;
use crate::query::{QueryController, RenderableResult};
use crate::render::{render_history, render_result};
use crate::session::Session;

pub const HELP_TEXT: &str = r#"Ask a question in plain English, or use a command:
  /history [n]              - Show the n most recent questions (default 10)
  /export <path> [--index]  - Save the last result as CSV or JSON
  /limit on|off|<n>         - Toggle the row limit or set the maximum rows
  /sql on|off               - Show the generated SQL before the result
  /help                     - Show this help message
  /quit, /exit              - Exit"#;

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A question for the controller.
    Ask(String),
    History(Option<usize>),
    Export { path: PathBuf, include_index: bool },
    /// Enable or disable the row limit.
    LimitToggle(bool),
    /// Set the maximum rows (also enables the limit).
    LimitRows(usize),
    ShowSql(bool),
    Help,
    Quit,
    /// A command that failed to parse, with a usage message.
    Invalid(String),
}

impl Command {
    pub fn parse(input: &str) -> Command {
        let input = input.trim();

        if !input.starts_with('/') {
            return Command::Ask(input.to_string());
        }

        let parts: Vec<&str> = input.splitn(2, ' ').collect();
        let command = parts[0].to_lowercase();
        let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

        match command.as_str() {
            "/history" => Self::parse_history(args),
            "/export" => Self::parse_export(args),
            "/limit" => Self::parse_limit(args),
            "/sql" => match parse_switch(args) {
                Some(on) => Command::ShowSql(on),
                None => Command::Invalid("Usage: /sql on|off".to_string()),
            },
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Invalid(format!("Unknown command: {command}. Type /help")),
        }
    }

    fn parse_history(args: &str) -> Command {
        if args.is_empty() {
            return Command::History(None);
        }
        match args.parse::<usize>() {
            Ok(n) => Command::History(Some(n)),
            Err(_) => Command::Invalid("Usage: /history [n]".to_string()),
        }
    }

    fn parse_export(args: &str) -> Command {
        let mut path = None;
        let mut include_index = false;
        for arg in args.split_whitespace() {
            match arg {
                "--index" => include_index = true,
                other if path.is_none() => path = Some(PathBuf::from(other)),
                _ => return Command::Invalid("Usage: /export <path> [--index]".to_string()),
            }
        }
        match path {
            Some(path) => Command::Export {
                path,
                include_index,
            },
            None => Command::Invalid("Usage: /export <path> [--index]".to_string()),
        }
    }

    fn parse_limit(args: &str) -> Command {
        if let Some(on) = parse_switch(args) {
            return Command::LimitToggle(on);
        }
        match args.parse::<usize>() {
            Ok(n) => Command::LimitRows(n),
            Err(_) => Command::Invalid("Usage: /limit on|off|<n>".to_string()),
        }
    }
}

fn parse_switch(arg: &str) -> Option<bool> {
    match arg.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Interactive session driving a controller.
pub struct Repl<'a> {
    controller: &'a QueryController,
    session: Session,
    last: Option<RenderableResult>,
}

impl<'a> Repl<'a> {
    pub fn new(controller: &'a QueryController, session: Session) -> Self {
        Self {
            controller,
            session,
            last: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Most recent request result, if any.
    pub fn last_result(&self) -> Option<&RenderableResult> {
        self.last.as_ref()
    }

    /// Reads lines until EOF or `/quit`.
    pub async fn run<R: BufRead, W: Write>(&mut self, input: R, output: &mut W) -> Result<()> {
        writeln!(output, "Type a question, or /help for commands.")?;
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if !self.handle_line(&line, output).await? {
                break;
            }
        }
        output.flush()?;
        Ok(())
    }

    /// Handles one line. Returns false when the session should end.
    pub async fn handle_line<W: Write>(&mut self, line: &str, output: &mut W) -> Result<bool> {
        match Command::parse(line) {
            Command::Ask(question) => {
                let rendered = self.controller.handle(&mut self.session, &question).await;
                for line in render_result(&rendered, self.session.settings().show_sql_first) {
                    writeln!(output, "{line}")?;
                }
                self.last = Some(rendered);
            }
            Command::History(n) => {
                let entries = match n {
                    Some(n) => self.session.ledger().recent(n),
                    None => self.session.visible_history(),
                };
                for line in render_history(&entries) {
                    writeln!(output, "{line}")?;
                }
            }
            Command::Export {
                path,
                include_index,
            } => self.export(&path, include_index, output)?,
            Command::LimitToggle(on) => {
                let settings = self.session.settings_mut();
                settings.policy.enabled = on;
                writeln!(
                    output,
                    "Row limit {} (max {} rows)",
                    if on { "enabled" } else { "disabled" },
                    settings.policy.max_rows
                )?;
            }
            Command::LimitRows(n) => match LimitPolicy::new(true, n) {
                Ok(policy) => {
                    self.session.settings_mut().policy = policy;
                    writeln!(output, "Row limit set to {n}")?;
                }
                Err(e) => writeln!(output, "{e}")?,
            },
            Command::ShowSql(on) => {
                self.session.settings_mut().show_sql_first = on;
                writeln!(
                    output,
                    "SQL will be shown {} the result",
                    if on { "before" } else { "after" }
                )?;
            }
            Command::Help => writeln!(output, "{HELP_TEXT}")?,
            Command::Quit => return Ok(false),
            Command::Invalid(message) => writeln!(output, "{message}")?,
        }
        Ok(true)
    }

    fn export<W: Write>(
        &self,
        path: &std::path::Path,
        include_index: bool,
        output: &mut W,
    ) -> Result<()> {
        let Some(last) = &self.last else {
            writeln!(output, "Nothing to export yet")?;
            return Ok(());
        };

        match export_to_path(last, path, ExportFormat::from_path(path), include_index) {
            Ok(rows) => writeln!(output, "Exported {rows} rows to {}", path.display())?,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Export failed");
                writeln!(output, "{e}")?;
            }
        }
        Ok(())
    }
}
