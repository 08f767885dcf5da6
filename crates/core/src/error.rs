//! Error types for the Loopwright domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each collaborator
//! boundary has its own error type; `Error` aggregates them for callers
//! that only want to bubble failures up.
//!
//! Recoverable execution problems are *not* errors here: they travel
//! through the history as `Observation::Failure`.

use serde::Serialize;
use thiserror::Error;

/// The top-level error type for Loopwright operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Decision errors ---
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    // --- Execution errors ---
    #[error("Runtime fault: {0}")]
    Runtime(#[from] RuntimeFault),

    // --- History / bookkeeping errors ---
    #[error("State error: {0}")]
    State(#[from] StateError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- I/O (export) ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// The decision policy could not produce an action. Always fatal to a run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PolicyError {
    #[error("Model provider unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Decision timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Policy has no more decisions (after {calls} calls)")]
    Exhausted { calls: usize },

    #[error("Internal policy error: {0}")]
    Internal(String),
}

/// The execution infrastructure failed. Always fatal to a run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RuntimeFault {
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("I/O subsystem fault: {0}")]
    Io(String),

    /// The runtime is in a state where it can no longer report anything.
    #[error("Runtime poisoned: {0}")]
    Poisoned(String),
}

impl RuntimeFault {
    /// Whether the fault can still be written to the history as a `Failure`
    /// observation before the run aborts.
    pub fn is_representable(&self) -> bool {
        match self {
            Self::ResourceExhausted(_) | Self::Io(_) => true,
            Self::Poisoned(_) => false,
        }
    }
}

/// Violations of the run-state bookkeeping rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Iteration budget must be positive")]
    InvalidBudget,

    #[error("Iteration budget of {max_iterations} already exhausted")]
    BudgetExhausted { max_iterations: u32 },

    #[error("Out-of-order append: expected {expected}, got {found}")]
    Alternation {
        expected: &'static str,
        found: &'static str,
    },

    #[error("History is closed: a finish action was already recorded")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
