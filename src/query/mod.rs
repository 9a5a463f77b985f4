//! Query execution for ask-db.
//!
//! The executor runs one question through translation, limit enforcement
//! and execution; the controller wraps it with validation, ledger logging
//! and the per-request state machine.

pub mod controller;
pub mod executor;
pub mod outcome;
pub mod phase;

pub use controller::QueryController;
pub use executor::QueryExecutor;
pub use outcome::{ExecutionOutcome, FailureKind, RenderableResult};
pub use phase::{PhaseTracker, RequestPhase};
