//! Terminal states of a run and the report handed back to callers.

use loopwright_core::error::{PolicyError, RuntimeFault};
use loopwright_core::event::{Action, Event};
use loopwright_core::state::State;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", content = "detail", rename_all = "kebab-case")]
pub enum AbortReason {
    PolicyError(PolicyError),
    RuntimeFault(RuntimeFault),
    Cancelled,
}

impl AbortReason {
    pub fn category(&self) -> &'static str {
        match self {
            Self::PolicyError(_) => "policy-error",
            Self::RuntimeFault(_) => "runtime-fault",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PolicyError(e) => write!(f, "policy-error: {e}"),
            Self::RuntimeFault(e) => write!(f, "runtime-fault: {e}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// The controller's state machine. Every state but `Running` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    FinishedNormal,
    FinishedBudgetExhausted,
    Aborted(AbortReason),
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::FinishedNormal => "finished",
            Self::FinishedBudgetExhausted => "budget_exhausted",
            Self::Aborted(_) => "aborted",
        }
    }
}

/// How a run ended, with what each ending carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// A `Finish` action was appended.
    Finished {
        outputs: BTreeMap<String, serde_json::Value>,
    },
    /// The iteration counter reached the bound.
    BudgetExhausted { iterations: u32 },
    Aborted { reason: AbortReason },
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }

    pub fn controller_state(&self) -> ControllerState {
        match self {
            Self::Finished { .. } => ControllerState::FinishedNormal,
            Self::BudgetExhausted { .. } => ControllerState::FinishedBudgetExhausted,
            Self::Aborted { reason } => ControllerState::Aborted(reason.clone()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Finished { .. } => "finished",
            Self::BudgetExhausted { .. } => "budget_exhausted",
            Self::Aborted { .. } => "aborted",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished { outputs } => {
                let rendered = serde_json::to_string(outputs).unwrap_or_default();
                write!(f, "finished {rendered}")
            }
            Self::BudgetExhausted { iterations } => {
                write!(f, "budget exhausted after {iterations} iterations")
            }
            Self::Aborted { reason } => write!(f, "aborted ({reason})"),
        }
    }
}

/// Everything a finished run leaves behind.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub status: RunStatus,
    pub state: State,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn events(&self) -> &[Event] {
        self.state.events()
    }

    pub fn iterations(&self) -> u32 {
        self.state.iteration()
    }

    /// Finish outputs, if the run finished normally.
    pub fn outputs(&self) -> Option<&BTreeMap<String, serde_json::Value>> {
        match &self.status {
            RunStatus::Finished { outputs } => Some(outputs),
            RunStatus::BudgetExhausted { .. } | RunStatus::Aborted { .. } => None,
        }
    }

    /// Text of the last message the agent sent, if any.
    pub fn last_message(&self) -> Option<&str> {
        self.state
            .actions()
            .filter_map(|action| match action {
                Action::SendMessage { text } => Some(text.as_str()),
                Action::RunCommand { .. } | Action::EditFile { .. } | Action::Finish { .. } => {
                    None
                }
            })
            .last()
    }
}
