//! # Loopwright Core
//!
//! Domain types and contracts for the Loopwright decide–execute–observe loop.
//! This crate holds no loop logic itself: it defines the closed event model,
//! the append-only run state, and the traits the controller drives.
//!
//! ## Layout
//!
//! - [`event`]: `Action`, `Observation`, `Event`
//! - [`state`]: `State`, the history plus iteration budget
//! - [`policy`] / [`runtime`]: the two collaborator contracts
//! - [`clock`]: injected time source for event timestamps
//! - [`export`]: JSON export of a history
//! - [`bus`]: progress notifications for observers

pub mod bus;
pub mod clock;
pub mod error;
pub mod event;
pub mod export;
pub mod policy;
pub mod runtime;
pub mod state;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use bus::{LoopEvent, LoopEventBus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, PolicyError, Result, RuntimeFault, StateError, ToolError};
pub use event::{
    Action, ActionKind, Event, EventPayload, EventSource, FailureCategory, Observation,
    ObservationKind,
};
pub use policy::DecisionPolicy;
pub use runtime::ExecutionRuntime;
pub use state::State;
pub use tool::{Tool, ToolRegistry, ToolResult};
