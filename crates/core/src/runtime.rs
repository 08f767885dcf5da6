//! ExecutionRuntime trait: turns an action into an observation.

use async_trait::async_trait;

use crate::error::RuntimeFault;
use crate::event::{Action, Observation};

/// Executes actions against an environment.
///
/// `execute` is total over `Action`: a variant the implementation does not
/// handle yields `Observation::unsupported(kind)`, never an error. Only a
/// genuine infrastructure failure is reported as a `RuntimeFault`.
#[async_trait]
pub trait ExecutionRuntime: Send + Sync {
    /// A human-readable name (e.g. "simulated").
    fn name(&self) -> &str;

    async fn execute(&self, action: &Action) -> Result<Observation, RuntimeFault>;
}
