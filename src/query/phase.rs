//! Per-request state machine.
//!
//! `Idle → Translating → Enforcing → Executing → {Succeeded | Failed} → Logged`.
//! Translation and enforcement may jump straight to `Failed`; `Idle` may go
//! straight to `Failed` for an empty question. No phase is entered twice.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestPhase {
    Idle,
    Translating,
    Enforcing,
    Executing,
    Succeeded,
    Failed,
    Logged,
}

impl RequestPhase {
    /// Returns true if `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: RequestPhase) -> bool {
        use RequestPhase::*;
        matches!(
            (self, next),
            (Idle, Translating)
                | (Idle, Failed)
                | (Translating, Enforcing)
                | (Translating, Failed)
                | (Enforcing, Executing)
                | (Enforcing, Failed)
                | (Executing, Succeeded)
                | (Executing, Failed)
                | (Succeeded, Logged)
                | (Failed, Logged)
        )
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Translating => "translating",
            Self::Enforcing => "enforcing",
            Self::Executing => "executing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Logged => "logged",
        };
        f.write_str(name)
    }
}

/// Records the phases one request passes through.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    path: Vec<RequestPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self {
            path: vec![RequestPhase::Idle],
        }
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> RequestPhase {
        self.path
            .last()
            .copied()
            .unwrap_or(RequestPhase::Idle)
    }

    /// Every phase visited so far, starting with `Idle`.
    pub fn path(&self) -> &[RequestPhase] {
        &self.path
    }

    /// Moves to `next`. Illegal transitions are logged and ignored.
    pub fn advance(&mut self, next: RequestPhase) -> bool {
        let current = self.current();
        if !current.can_advance_to(next) {
            tracing::error!(from = %current, to = %next, "Illegal request phase transition");
            return false;
        }
        tracing::debug!(from = %current, to = %next, "Request phase");
        self.path.push(next);
        true
    }
}
