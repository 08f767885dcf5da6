//! DecisionPolicy trait: the abstraction over "what should the agent do next".
//!
//! A policy may be a keyword matcher, a model provider behind the network,
//! or a fixed script. The controller calls `next()` without knowing which,
//! and treats every call as a suspension point.

use async_trait::async_trait;

use crate::error::PolicyError;
use crate::event::Action;
use crate::state::State;

/// Chooses the next action from the run so far.
///
/// Implementations only ever see `&State`, so they cannot append to the
/// history or touch the iteration counter. Any transport or provider error
/// must be mapped into `PolicyError`.
#[async_trait]
pub trait DecisionPolicy: Send + Sync {
    /// A human-readable name (e.g. "mock", "openai", "assistant").
    fn name(&self) -> &str;

    /// Decide the next action. Called repeatedly with a growing state.
    async fn next(&self, state: &State) -> Result<Action, PolicyError>;
}
