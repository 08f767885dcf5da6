//! Scripted policy: replays a fixed list of decisions.

use async_trait::async_trait;
use loopwright_core::error::PolicyError;
use loopwright_core::event::Action;
use loopwright_core::policy::DecisionPolicy;
use loopwright_core::state::State;
use std::sync::Mutex;
use std::time::Duration;

struct Script {
    steps: Vec<Result<Action, PolicyError>>,
    cursor: usize,
    calls: usize,
}

/// Returns its steps in order, one per call.
///
/// When the steps run out it fails with `PolicyError::Exhausted`, unless
/// built with [`ScriptedPolicy::cycling`], which starts over.
pub struct ScriptedPolicy {
    script: Mutex<Script>,
    cycle: bool,
    delay: Option<Duration>,
}

impl ScriptedPolicy {
    pub fn new(steps: Vec<Result<Action, PolicyError>>) -> Self {
        Self {
            script: Mutex::new(Script {
                steps,
                cursor: 0,
                calls: 0,
            }),
            cycle: false,
            delay: None,
        }
    }

    /// Like `new`, but restarts from the first step after the last.
    pub fn cycling(steps: Vec<Result<Action, PolicyError>>) -> Self {
        Self {
            cycle: true,
            ..Self::new(steps)
        }
    }

    /// Returns `action` on every call.
    pub fn always(action: Action) -> Self {
        Self::cycling(vec![Ok(action)])
    }

    /// Actions only, in order.
    pub fn from_actions(actions: impl IntoIterator<Item = Action>) -> Self {
        Self::new(actions.into_iter().map(Ok).collect())
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `next` has been called.
    pub fn calls(&self) -> usize {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).calls
    }

    fn take(&self) -> Result<Action, PolicyError> {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.calls += 1;

        if script.cursor >= script.steps.len() {
            if self.cycle && !script.steps.is_empty() {
                script.cursor = 0;
            } else {
                return Err(PolicyError::Exhausted {
                    calls: script.calls,
                });
            }
        }

        let step = script.steps[script.cursor].clone();
        script.cursor += 1;
        step
    }
}

#[async_trait]
impl DecisionPolicy for ScriptedPolicy {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn next(&self, _state: &State) -> Result<Action, PolicyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.take()
    }
}
