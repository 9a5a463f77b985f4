//! Per-session state.
//!
//! A `Session` is created by whoever drives the controller and passed in by
//! mutable reference, so independent sessions never share a ledger.

use crate::config::LimitsConfig;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::limit::LimitPolicy;

/// User-adjustable settings for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub policy: LimitPolicy,
    /// Number of recent entries the history view shows.
    pub history_display: usize,
    /// Print the generated SQL before running it.
    pub show_sql_first: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            policy: LimitPolicy::default(),
            history_display: crate::config::DEFAULT_HISTORY_DISPLAY,
            show_sql_first: false,
        }
    }
}

/// State owned by one interactive session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    ledger: Ledger,
    settings: SessionSettings,
}

impl Session {
    /// Creates a session with default settings and an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session from configured limits.
    pub fn from_limits(limits: &LimitsConfig) -> Result<Self> {
        Ok(Self {
            ledger: Ledger::with_capacity(limits.ledger_bound()),
            settings: SessionSettings {
                policy: limits.policy()?,
                history_display: limits.history_display,
                show_sql_first: false,
            },
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Mutable ledger access for the controller only.
    pub(crate) fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SessionSettings {
        &mut self.settings
    }

    /// The ledger entries the history view should show.
    pub fn visible_history(&self) -> Vec<&crate::ledger::LedgerEntry> {
        self.ledger.recent(self.settings.history_display)
    }
}
