//! The agent controller: drives one run from task to terminal state.
//!
//! Each iteration:
//!
//! 1. stop if cancellation was requested,
//! 2. ask the policy for an action (under the policy deadline),
//! 3. append the action; stop if it is `Finish`,
//! 4. execute it (under the runtime deadline) and append the observation,
//! 5. advance the iteration counter; stop when it reaches the bound.
//!
//! Policy errors and runtime faults abort the run. Everything else,
//! including a runtime deadline breach, is recorded as an observation and
//! the loop goes on.

use loopwright_config::AgentConfig;
use loopwright_core::bus::{LoopEvent, LoopEventBus};
use loopwright_core::clock::{Clock, SystemClock};
use loopwright_core::error::{PolicyError, Result, RuntimeFault};
use loopwright_core::event::{Action, Event, FailureCategory, Observation};
use loopwright_core::policy::DecisionPolicy;
use loopwright_core::runtime::ExecutionRuntime;
use loopwright_core::state::State;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::status::{AbortReason, RunReport, RunStatus};

/// Owns the collaborators; never the run state.
///
/// All run methods take `&self`, so one controller behind an `Arc` can
/// drive any number of concurrent runs, each with its own `State`.
pub struct AgentController {
    policy: Arc<dyn DecisionPolicy>,
    runtime: Arc<dyn ExecutionRuntime>,
    clock: Arc<dyn Clock>,
    policy_timeout: Option<Duration>,
    runtime_timeout: Option<Duration>,
    event_bus: Option<Arc<LoopEventBus>>,
}

impl AgentController {
    pub fn new(policy: Arc<dyn DecisionPolicy>, runtime: Arc<dyn ExecutionRuntime>) -> Self {
        Self {
            policy,
            runtime,
            clock: Arc::new(SystemClock),
            policy_timeout: None,
            runtime_timeout: None,
            event_bus: None,
        }
    }

    /// Clock used to stamp every appended event.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy_timeout(mut self, limit: Duration) -> Self {
        self.policy_timeout = Some(limit);
        self
    }

    pub fn with_runtime_timeout(mut self, limit: Duration) -> Self {
        self.runtime_timeout = Some(limit);
        self
    }

    /// Apply the deadlines from the `[agent]` config section.
    pub fn with_agent_config(mut self, config: &AgentConfig) -> Self {
        self.policy_timeout = config.policy_timeout();
        self.runtime_timeout = config.runtime_timeout();
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<LoopEventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Run `task` to a terminal state.
    ///
    /// Returns `Err` only for a bad budget or a bookkeeping bug; aborted
    /// runs are an `Ok` report with `RunStatus::Aborted`.
    pub async fn run(&self, task: impl Into<String>, max_iterations: u32) -> Result<RunReport> {
        self.run_with_cancellation(task, max_iterations, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), checking `cancel` before every iteration.
    pub async fn run_with_cancellation(
        &self,
        task: impl Into<String>,
        max_iterations: u32,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let state = State::new(task, max_iterations)?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);

        self.drive(run_id, state, cancel).instrument(span).await
    }

    /// Start a run on its own tokio task.
    pub fn spawn(self: &Arc<Self>, task: impl Into<String>, max_iterations: u32) -> RunHandle {
        let controller = Arc::clone(self);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = task.into();

        let join = tokio::spawn(async move {
            controller
                .run_with_cancellation(task, max_iterations, &token)
                .await
        });

        RunHandle { join, cancel }
    }

    async fn drive(
        &self,
        run_id: String,
        mut state: State,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        info!(
            task = %state.task(),
            max_iterations = state.max_iterations(),
            policy = %self.policy.name(),
            runtime = %self.runtime.name(),
            "Run started"
        );
        self.notify(|| LoopEvent::RunStarted {
            run_id: run_id.clone(),
            task: state.task().to_string(),
            max_iterations: state.max_iterations(),
        });

        let status = loop {
            if cancel.is_cancelled() {
                info!(iteration = state.iteration(), "Run cancelled");
                break RunStatus::Aborted {
                    reason: AbortReason::Cancelled,
                };
            }

            let iteration = state.iteration();
            debug!(iteration, "Loop iteration");

            let action = match self.decide(&state).await {
                Ok(action) => action,
                Err(e) => {
                    warn!(iteration, error = %e, "Policy failed, aborting run");
                    break RunStatus::Aborted {
                        reason: AbortReason::PolicyError(e),
                    };
                }
            };

            let appended = state.append(Event::action(action.clone(), self.clock.as_ref()))?;
            debug!(iteration, action = %appended, "Action appended");
            self.notify(|| LoopEvent::ActionAppended {
                run_id: run_id.clone(),
                iteration,
                event: appended.clone(),
            });

            match &action {
                Action::Finish { outputs } => {
                    break RunStatus::Finished {
                        outputs: outputs.clone(),
                    };
                }
                Action::SendMessage { .. } | Action::RunCommand { .. } | Action::EditFile { .. } => {}
            }

            let observation = match self.execute(&action).await {
                Ok(observation) => observation,
                Err(fault) => {
                    warn!(iteration, error = %fault, "Runtime fault, aborting run");
                    if let Some(observation) = Observation::from_fault(&fault) {
                        self.record(&mut state, &run_id, iteration, observation)?;
                    }
                    break RunStatus::Aborted {
                        reason: AbortReason::RuntimeFault(fault),
                    };
                }
            };
            self.record(&mut state, &run_id, iteration, observation)?;

            let completed = state.advance_iteration()?;
            if state.is_budget_exhausted() {
                info!(iterations = completed, "Iteration budget exhausted");
                break RunStatus::BudgetExhausted {
                    iterations: completed,
                };
            }
        };

        info!(
            status = status.label(),
            iterations = state.iteration(),
            events = state.len(),
            "Run finished"
        );
        self.notify(|| LoopEvent::RunFinished {
            run_id: run_id.clone(),
            status: status.label().to_string(),
            iterations: state.iteration(),
            events: state.len(),
        });

        Ok(RunReport {
            run_id,
            status,
            state,
        })
    }

    async fn decide(&self, state: &State) -> std::result::Result<Action, PolicyError> {
        match self.policy_timeout {
            Some(limit) => tokio::time::timeout(limit, self.policy.next(state))
                .await
                .unwrap_or_else(|_| {
                    Err(PolicyError::Timeout {
                        after_ms: limit.as_millis() as u64,
                    })
                }),
            None => self.policy.next(state).await,
        }
    }

    async fn execute(&self, action: &Action) -> std::result::Result<Observation, RuntimeFault> {
        match self.runtime_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.runtime.execute(action)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(action = %action.kind(), limit_ms = limit.as_millis() as u64, "Runtime deadline exceeded");
                    Ok(Observation::failure(
                        FailureCategory::Timeout,
                        format!(
                            "{} did not complete within {}ms",
                            action.kind(),
                            limit.as_millis()
                        ),
                    ))
                }
            },
            None => self.runtime.execute(action).await,
        }
    }

    fn record(
        &self,
        state: &mut State,
        run_id: &str,
        iteration: u32,
        observation: Observation,
    ) -> Result<()> {
        let appended = state.append(Event::observation(observation, self.clock.as_ref()))?;
        debug!(iteration, observation = %appended, "Observation appended");
        self.notify(|| LoopEvent::ObservationAppended {
            run_id: run_id.to_string(),
            iteration,
            event: appended.clone(),
        });
        Ok(())
    }

    fn notify(&self, make: impl FnOnce() -> LoopEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(make());
        }
    }
}

/// A run executing on its own task.
pub struct RunHandle {
    join: JoinHandle<Result<RunReport>>,
    cancel: CancellationToken,
}

impl RunHandle {
    /// Ask the run to stop before its next iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to reach a terminal state.
    pub async fn join(self) -> Result<RunReport> {
        self.join.await.map_err(|e| {
            loopwright_core::Error::Internal(format!("Run task did not complete: {e}"))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ControllerState;
    use async_trait::async_trait;
    use loopwright_core::Error;
    use loopwright_core::clock::ManualClock;
    use loopwright_core::error::StateError;
    use loopwright_core::event::{ActionKind, EventSource};
    use loopwright_policies::ScriptedPolicy;
    use loopwright_runtime::{FileStore, SimulatedRuntime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn controller(policy: ScriptedPolicy, runtime: SimulatedRuntime) -> AgentController {
        AgentController::new(Arc::new(policy), Arc::new(runtime))
            .with_clock(Arc::new(ManualClock::starting_at_fixed_instant()))
    }

    fn observation_at(report: &RunReport, index: usize) -> &Observation {
        report.events()[index].as_observation().unwrap()
    }

    #[tokio::test]
    async fn budget_exhaustion_after_three_commands() {
        let c = controller(
            ScriptedPolicy::always(Action::run_command("pwd")),
            SimulatedRuntime::new(),
        );
        let report = c.run("where am I", 3).await.unwrap();

        assert_eq!(report.status, RunStatus::BudgetExhausted { iterations: 3 });
        assert_eq!(report.events().len(), 6);
        assert_eq!(report.iterations(), 3);
        for (i, event) in report.events().iter().enumerate() {
            assert_eq!(event.sequence, i);
            if i % 2 == 0 {
                assert_eq!(event.source, EventSource::Agent);
                assert_eq!(event.as_action(), Some(&Action::run_command("pwd")));
            } else {
                assert_eq!(event.source, EventSource::Environment);
                assert_eq!(
                    event.as_observation(),
                    Some(&Observation::command_output("pwd", "/tmp", 0))
                );
            }
        }
    }

    #[tokio::test]
    async fn immediate_finish() {
        let c = controller(
            ScriptedPolicy::from_actions([Action::finish([("status", "done")])]),
            SimulatedRuntime::new(),
        );
        let report = c.run("nothing to do", 5).await.unwrap();

        assert_eq!(report.events().len(), 1);
        assert!(report.is_success());
        assert_eq!(
            report.outputs().unwrap().get("status"),
            Some(&serde_json::json!("done"))
        );
        assert_eq!(report.status.controller_state(), ControllerState::FinishedNormal);
        assert_eq!(report.iterations(), 0);
    }

    #[tokio::test]
    async fn unsupported_action_is_recorded_and_run_continues() {
        let c = controller(
            ScriptedPolicy::from_actions([
                Action::edit_file("/tmp/x", "y"),
                Action::finish([("status", "done")]),
            ]),
            SimulatedRuntime::new().with_disabled(ActionKind::EditFile),
        );
        let report = c.run("edit", 5).await.unwrap();

        assert_eq!(report.events().len(), 3);
        assert_eq!(
            observation_at(&report, 1),
            &Observation::unsupported(ActionKind::EditFile)
        );
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn policy_error_on_second_call_aborts() {
        let c = controller(
            ScriptedPolicy::new(vec![
                Ok(Action::run_command("pwd")),
                Err(PolicyError::Unavailable("provider down".into())),
            ]),
            SimulatedRuntime::new(),
        );
        let report = c.run("task", 5).await.unwrap();

        assert_eq!(report.events().len(), 2);
        assert_eq!(
            report.status,
            RunStatus::Aborted {
                reason: AbortReason::PolicyError(PolicyError::Unavailable("provider down".into()))
            }
        );
        match &report.status {
            RunStatus::Aborted { reason } => assert_eq!(reason.category(), "policy-error"),
            RunStatus::Finished { .. } | RunStatus::BudgetExhausted { .. } => {
                panic!("expected abort")
            }
        }
    }

    #[tokio::test]
    async fn cancelled_before_first_iteration() {
        let c = controller(
            ScriptedPolicy::always(Action::run_command("pwd")),
            SimulatedRuntime::new(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = c.run_with_cancellation("task", 5, &cancel).await.unwrap();
        assert!(report.events().is_empty());
        assert_eq!(
            report.status,
            RunStatus::Aborted {
                reason: AbortReason::Cancelled
            }
        );
    }

    /// Cancels the token on its `cancel_on`-th call, still returning an action.
    struct CancellingPolicy {
        token: CancellationToken,
        cancel_on: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DecisionPolicy for CancellingPolicy {
        fn name(&self) -> &str {
            "cancelling"
        }

        async fn next(&self, _state: &State) -> std::result::Result<Action, PolicyError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.cancel_on {
                self.token.cancel();
            }
            Ok(Action::run_command("pwd"))
        }
    }

    #[tokio::test]
    async fn cancellation_takes_effect_between_iterations() {
        let token = CancellationToken::new();
        let policy = CancellingPolicy {
            token: token.clone(),
            cancel_on: 2,
            calls: AtomicUsize::new(0),
        };
        let c = AgentController::new(Arc::new(policy), Arc::new(SimulatedRuntime::new()));

        let report = c.run_with_cancellation("task", 10, &token).await.unwrap();
        // The in-flight iteration completes before the signal is seen.
        assert_eq!(report.events().len(), 4);
        assert_eq!(report.iterations(), 2);
        assert_eq!(
            report.status,
            RunStatus::Aborted {
                reason: AbortReason::Cancelled
            }
        );
    }

    struct SlowRuntime;

    #[async_trait]
    impl ExecutionRuntime for SlowRuntime {
        fn name(&self) -> &str {
            "slow"
        }

        async fn execute(
            &self,
            _action: &Action,
        ) -> std::result::Result<Observation, RuntimeFault> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Observation::command_output("late", "too late", 0))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_deadline_becomes_timeout_failure() {
        let c = AgentController::new(
            Arc::new(ScriptedPolicy::always(Action::run_command("sleep"))),
            Arc::new(SlowRuntime),
        )
        .with_runtime_timeout(Duration::from_secs(1));

        let report = c.run("task", 2).await.unwrap();
        assert_eq!(report.status, RunStatus::BudgetExhausted { iterations: 2 });
        assert_eq!(report.events().len(), 4);
        match observation_at(&report, 1) {
            Observation::Failure { category, .. } => assert_eq!(*category, FailureCategory::Timeout),
            Observation::CommandOutput { .. } | Observation::FileContent { .. } => {
                panic!("expected a timeout failure")
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn policy_deadline_aborts() {
        let c = controller(
            ScriptedPolicy::always(Action::run_command("pwd")).with_delay(Duration::from_secs(30)),
            SimulatedRuntime::new(),
        )
        .with_policy_timeout(Duration::from_secs(1));

        let report = c.run("task", 3).await.unwrap();
        assert!(report.events().is_empty());
        assert_eq!(
            report.status,
            RunStatus::Aborted {
                reason: AbortReason::PolicyError(PolicyError::Timeout { after_ms: 1000 })
            }
        );
    }

    #[tokio::test]
    async fn representable_fault_is_recorded_then_aborts() {
        let c = controller(
            ScriptedPolicy::from_actions([
                Action::edit_file("/tmp/a", "1"),
                Action::edit_file("/tmp/b", "2"),
            ]),
            SimulatedRuntime::new().with_store(FileStore::with_capacity_limit(1)),
        );
        let report = c.run("fill the disk", 5).await.unwrap();

        assert_eq!(report.events().len(), 4);
        match observation_at(&report, 3) {
            Observation::Failure { category, .. } => {
                assert_eq!(*category, FailureCategory::ResourceExhausted)
            }
            Observation::CommandOutput { .. } | Observation::FileContent { .. } => {
                panic!("expected a resource-exhausted failure")
            }
        }
        assert!(matches!(
            report.status,
            RunStatus::Aborted {
                reason: AbortReason::RuntimeFault(RuntimeFault::ResourceExhausted(_))
            }
        ));
    }

    struct PoisonedRuntime;

    #[async_trait]
    impl ExecutionRuntime for PoisonedRuntime {
        fn name(&self) -> &str {
            "poisoned"
        }

        async fn execute(
            &self,
            _action: &Action,
        ) -> std::result::Result<Observation, RuntimeFault> {
            Err(RuntimeFault::Poisoned("lost the sandbox".into()))
        }
    }

    #[tokio::test]
    async fn unrepresentable_fault_aborts_without_observation() {
        let c = AgentController::new(
            Arc::new(ScriptedPolicy::always(Action::run_command("pwd"))),
            Arc::new(PoisonedRuntime),
        );
        let report = c.run("task", 5).await.unwrap();
        assert_eq!(report.events().len(), 1);
        assert_eq!(report.status.label(), "aborted");
    }

    #[tokio::test]
    async fn zero_budget_is_an_error() {
        let c = controller(
            ScriptedPolicy::always(Action::run_command("pwd")),
            SimulatedRuntime::new(),
        );
        let err = c.run("task", 0).await.unwrap_err();
        assert!(matches!(err, Error::State(StateError::InvalidBudget)));
    }

    #[tokio::test]
    async fn identical_inputs_give_identical_histories() {
        let script = || {
            ScriptedPolicy::from_actions([
                Action::send_message("hi"),
                Action::run_command("date"),
                Action::edit_file("/tmp/out", "x"),
                Action::finish([("status", "done")]),
            ])
        };
        let runtime = || {
            SimulatedRuntime::new().with_clock(Arc::new(ManualClock::starting_at_fixed_instant()))
        };

        let first = controller(script(), runtime()).run("", 10).await.unwrap();
        let second = controller(script(), runtime()).run("", 10).await.unwrap();
        assert_eq!(first.events(), second.events());
        assert_eq!(first.events().len(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_runs_keep_separate_histories() {
        let c = Arc::new(controller(
            ScriptedPolicy::always(Action::run_command("pwd")),
            SimulatedRuntime::new(),
        ));

        let handles: Vec<_> = (1..=3).map(|n| c.spawn(format!("run {n}"), n)).collect();
        for (n, handle) in (1..=3u32).zip(handles) {
            let report = handle.join().await.unwrap();
            assert_eq!(report.state.task(), format!("run {n}"));
            assert_eq!(report.events().len(), 2 * n as usize);
            assert_eq!(report.status, RunStatus::BudgetExhausted { iterations: n });
        }
    }

    #[tokio::test]
    async fn progress_is_published_on_the_bus() {
        let bus = Arc::new(LoopEventBus::default());
        let mut rx = bus.subscribe();
        let c = controller(
            ScriptedPolicy::from_actions([
                Action::run_command("pwd"),
                Action::finish([("status", "done")]),
            ]),
            SimulatedRuntime::new(),
        )
        .with_event_bus(bus);

        let report = c.run("task", 5).await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.run_id(), report.run_id);
            kinds.push(match event.as_ref() {
                LoopEvent::RunStarted { .. } => "started",
                LoopEvent::ActionAppended { .. } => "action",
                LoopEvent::ObservationAppended { .. } => "observation",
                LoopEvent::RunFinished { status, .. } => {
                    assert_eq!(status, "finished");
                    "finished"
                }
            });
        }
        assert_eq!(kinds, vec!["started", "action", "observation", "action", "finished"]);
    }
}
