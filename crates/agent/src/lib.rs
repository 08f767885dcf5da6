//! The Loopwright agent loop.
//!
//! [`AgentController`] runs the **decide → execute → observe** cycle:
//!
//! 1. **Decide**: ask the [`DecisionPolicy`](loopwright_core::DecisionPolicy)
//!    for the next action given the run's state
//! 2. **Record** the action; a `Finish` ends the run
//! 3. **Execute** it on the [`ExecutionRuntime`](loopwright_core::ExecutionRuntime)
//! 4. **Observe**: record what the runtime reported, then go again
//!
//! The loop stops on `Finish`, when the iteration budget runs out, on a
//! policy error or runtime fault, or when cancelled.

pub mod controller;
pub mod status;

pub use controller::{AgentController, RunHandle};
pub use status::{AbortReason, ControllerState, RunReport, RunStatus};
