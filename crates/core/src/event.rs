//! The event model: every fact in a run is an `Event`.
//!
//! An event is either an `Action` (issued by the agent) or an `Observation`
//! (produced by the environment). Both are closed enums, so every consumer
//! that matches on them is checked for exhaustiveness by the compiler;
//! adding a variant is a breaking change on purpose.
//!
//! Serialized form (the export contract):
//!
//! ```json
//! {"sequence":0,"source":"agent","created_at":"2024-01-01T00:00:00Z",
//!  "kind":"run_command","command":"pwd"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::clock::Clock;
use crate::error::RuntimeFault;

/// Who produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Agent,
    Environment,
    User,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Environment => "environment",
            Self::User => "user",
        }
    }
}

// ── Actions ───────────────────────────────────────────────────────────────

/// An agent-issued intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    SendMessage {
        text: String,
    },
    RunCommand {
        command: String,
    },
    EditFile {
        path: String,
        content: String,
    },
    /// Terminal: ends the run normally. Never reaches the runtime.
    Finish {
        outputs: BTreeMap<String, serde_json::Value>,
    },
}

/// Fieldless mirror of `Action`, used for capability sets and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendMessage,
    RunCommand,
    EditFile,
    Finish,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::SendMessage,
        ActionKind::RunCommand,
        ActionKind::EditFile,
        ActionKind::Finish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendMessage => "send_message",
            Self::RunCommand => "run_command",
            Self::EditFile => "edit_file",
            Self::Finish => "finish",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown action kind: {s}"))
    }
}

impl Action {
    pub fn send_message(text: impl Into<String>) -> Self {
        Self::SendMessage { text: text.into() }
    }

    pub fn run_command(command: impl Into<String>) -> Self {
        Self::RunCommand {
            command: command.into(),
        }
    }

    pub fn edit_file(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::EditFile {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn finish<K, V>(outputs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        Self::Finish {
            outputs: outputs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::SendMessage { .. } => ActionKind::SendMessage,
            Self::RunCommand { .. } => ActionKind::RunCommand,
            Self::EditFile { .. } => ActionKind::EditFile,
            Self::Finish { .. } => ActionKind::Finish,
        }
    }

    /// Whether appending this action ends the run.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Finish { .. } => true,
            Self::SendMessage { .. } | Self::RunCommand { .. } | Self::EditFile { .. } => false,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendMessage { text } => write!(f, "SendMessage(text={text:?})"),
            Self::RunCommand { command } => write!(f, "RunCommand(command={command:?})"),
            Self::EditFile { path, .. } => write!(f, "EditFile(path={path:?})"),
            Self::Finish { outputs } => {
                let rendered = serde_json::to_string(outputs).unwrap_or_default();
                write!(f, "Finish(outputs={rendered})")
            }
        }
    }
}

// ── Observations ──────────────────────────────────────────────────────────

/// Why an execution produced a `Failure` observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCategory {
    /// The runtime does not handle this action variant.
    UnsupportedAction,
    /// The runtime did not answer before its deadline.
    Timeout,
    /// The action was understood but its arguments were rejected.
    InvalidAction,
    /// The environment reported an error.
    Environment,
    /// A store or quota ran out.
    ResourceExhausted,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedAction => "unsupported-action",
            Self::Timeout => "timeout",
            Self::InvalidAction => "invalid-action",
            Self::Environment => "environment",
            Self::ResourceExhausted => "resource-exhausted",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An environment-produced result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    CommandOutput {
        command: String,
        content: String,
        exit_code: i32,
    },
    FileContent {
        path: String,
        content: String,
    },
    /// Recoverable, in-band failure. The loop keeps going.
    Failure {
        message: String,
        category: FailureCategory,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    CommandOutput,
    FileContent,
    Failure,
}

impl ObservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommandOutput => "command_output",
            Self::FileContent => "file_content",
            Self::Failure => "failure",
        }
    }
}

impl Observation {
    pub fn command_output(
        command: impl Into<String>,
        content: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self::CommandOutput {
            command: command.into(),
            content: content.into(),
            exit_code,
        }
    }

    pub fn file_content(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::FileContent {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn failure(category: FailureCategory, message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            category,
        }
    }

    /// The standard answer for an action variant a runtime does not handle.
    pub fn unsupported(kind: ActionKind) -> Self {
        Self::failure(
            FailureCategory::UnsupportedAction,
            format!("Unsupported action: {kind}"),
        )
    }

    /// Render a runtime fault as a failure observation, if it still can be.
    pub fn from_fault(fault: &RuntimeFault) -> Option<Self> {
        match fault {
            RuntimeFault::ResourceExhausted(msg) => Some(Self::failure(
                FailureCategory::ResourceExhausted,
                msg.clone(),
            )),
            RuntimeFault::Io(msg) => Some(Self::failure(FailureCategory::Environment, msg.clone())),
            RuntimeFault::Poisoned(_) => None,
        }
    }

    pub fn kind(&self) -> ObservationKind {
        match self {
            Self::CommandOutput { .. } => ObservationKind::CommandOutput,
            Self::FileContent { .. } => ObservationKind::FileContent,
            Self::Failure { .. } => ObservationKind::Failure,
        }
    }

    pub fn is_failure(&self) -> bool {
        match self {
            Self::Failure { .. } => true,
            Self::CommandOutput { .. } | Self::FileContent { .. } => false,
        }
    }

    /// The textual body of the observation.
    pub fn content(&self) -> &str {
        match self {
            Self::CommandOutput { content, .. } | Self::FileContent { content, .. } => content,
            Self::Failure { message, .. } => message,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandOutput { exit_code, .. } => {
                write!(f, "CommandOutput(exit_code={exit_code})")
            }
            Self::FileContent { path, .. } => write!(f, "FileContent(path={path:?})"),
            Self::Failure { category, .. } => write!(f, "Failure(category={category})"),
        }
    }
}

// ── Events ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    Action(Action),
    Observation(Observation),
}

/// One immutable entry in a run's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position in the history; assigned by `State::append`.
    pub sequence: usize,
    pub source: EventSource,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: EventSource, payload: EventPayload, clock: &dyn Clock) -> Self {
        Self {
            sequence: 0,
            source,
            created_at: clock.now(),
            payload,
        }
    }

    /// An agent-sourced action event.
    pub fn action(action: Action, clock: &dyn Clock) -> Self {
        Self::new(EventSource::Agent, EventPayload::Action(action), clock)
    }

    /// An environment-sourced observation event.
    pub fn observation(observation: Observation, clock: &dyn Clock) -> Self {
        Self::new(
            EventSource::Environment,
            EventPayload::Observation(observation),
            clock,
        )
    }

    pub fn as_action(&self) -> Option<&Action> {
        match &self.payload {
            EventPayload::Action(action) => Some(action),
            EventPayload::Observation(_) => None,
        }
    }

    pub fn as_observation(&self) -> Option<&Observation> {
        match &self.payload {
            EventPayload::Observation(observation) => Some(observation),
            EventPayload::Action(_) => None,
        }
    }

    /// The snake_case variant name, as used in exports.
    pub fn kind_name(&self) -> &'static str {
        match &self.payload {
            EventPayload::Action(action) => action.kind().as_str(),
            EventPayload::Observation(observation) => observation.kind().as_str(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            EventPayload::Action(action) => write!(f, "#{} {}", self.sequence, action),
            EventPayload::Observation(observation) => {
                write!(f, "#{} {}", self.sequence, observation)
            }
        }
    }
}
