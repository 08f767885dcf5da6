//! Subcommand implementations and the pieces they share.

pub mod chat;
pub mod config_cmd;
pub mod demo;
pub mod run;

use loopwright_agent::{AgentController, RunReport, RunStatus};
use loopwright_config::AppConfig;
use loopwright_core::bus::{LoopEvent, LoopEventBus};
use loopwright_runtime::SimulatedRuntime;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Load the config file, applying a `--policy` override if given.
pub fn load_config(policy: Option<String>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(policy) = policy {
        config.policy = policy.parse()?;
    }
    Ok(config)
}

/// Wire policy, runtime and event bus together as configured.
pub fn build_controller(
    config: &AppConfig,
) -> Result<(AgentController, Arc<LoopEventBus>), Box<dyn std::error::Error>> {
    let policy = loopwright_policies::build_from_config(config)?;
    let runtime = Arc::new(SimulatedRuntime::from_config(&config.runtime));
    let bus = Arc::new(LoopEventBus::default());

    let controller = AgentController::new(policy, runtime)
        .with_agent_config(&config.agent)
        .with_event_bus(Arc::clone(&bus));

    Ok((controller, bus))
}

/// Run `task`, cancelling it before its next iteration once `interrupt`
/// resolves.
pub async fn run_until_interrupted(
    controller: &AgentController,
    task: &str,
    max_iterations: u32,
    interrupt: impl Future<Output = ()>,
) -> loopwright_core::Result<RunReport> {
    let cancel = CancellationToken::new();
    let run = controller.run_with_cancellation(task, max_iterations, &cancel);
    tokio::pin!(run);
    tokio::pin!(interrupt);

    let mut interrupted = false;
    loop {
        tokio::select! {
            outcome = &mut run => return outcome,
            () = &mut interrupt, if !interrupted => {
                interrupted = true;
                tracing::info!("Interrupt received, stopping after the current iteration");
                cancel.cancel();
            }
        }
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Print loop progress as it happens. Stops after `RunFinished`.
pub fn spawn_trace_printer(mut rx: broadcast::Receiver<Arc<LoopEvent>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut max_iterations = 0;
        loop {
            match rx.recv().await {
                Ok(event) => match event.as_ref() {
                    LoopEvent::RunStarted {
                        task,
                        max_iterations: max,
                        ..
                    } => {
                        max_iterations = *max;
                        println!("🚀 Task: {task}");
                        println!("{}", "=".repeat(60));
                    }
                    LoopEvent::ActionAppended {
                        iteration, event, ..
                    } => {
                        println!("\n🔄 Iteration {}/{}", iteration + 1, max_iterations);
                        println!("🤖 Action:      {event}");
                    }
                    LoopEvent::ObservationAppended { event, .. } => {
                        println!("👁️  Observation: {event}");
                    }
                    LoopEvent::RunFinished {
                        status,
                        iterations,
                        events,
                        ..
                    } => {
                        println!(
                            "\n📊 Run {status}: {iterations} iteration(s), {events} event(s)"
                        );
                        break;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Trace printer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Wait for the printer when the run reported; drop it otherwise.
pub async fn settle_printer<T, E>(printer: JoinHandle<()>, outcome: &Result<T, E>) {
    if outcome.is_ok() {
        let _ = printer.await;
    } else {
        printer.abort();
    }
}

pub fn print_status(report: &RunReport) {
    match &report.status {
        RunStatus::Finished { outputs } => {
            println!("✅ Finished");
            for (key, value) in outputs {
                match value.as_str() {
                    Some(text) => println!("   {key}: {text}"),
                    None => println!("   {key}: {value}"),
                }
            }
        }
        RunStatus::BudgetExhausted { iterations } => {
            println!("⏹️  Iteration budget exhausted after {iterations} iteration(s)");
        }
        RunStatus::Aborted { reason } => {
            println!("❌ Aborted ({}): {reason}", reason.category());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopwright_agent::AbortReason;
    use loopwright_core::event::Action;
    use loopwright_policies::ScriptedPolicy;
    use std::time::Duration;

    fn slow_controller() -> AgentController {
        AgentController::new(
            Arc::new(
                ScriptedPolicy::always(Action::run_command("pwd"))
                    .with_delay(Duration::from_secs(1)),
            ),
            Arc::new(SimulatedRuntime::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_cancels_the_run_in_flight() {
        let controller = slow_controller();
        let report = run_until_interrupted(
            &controller,
            "long task",
            1_000,
            tokio::time::sleep(Duration::from_millis(2_500)),
        )
        .await
        .unwrap();

        assert_eq!(
            report.status,
            RunStatus::Aborted {
                reason: AbortReason::Cancelled
            }
        );
        assert_eq!(report.iterations(), 3);
        assert_eq!(report.events().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn run_without_interrupt_reaches_its_budget() {
        let controller = slow_controller();
        let report = run_until_interrupted(&controller, "short task", 2, std::future::pending())
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::BudgetExhausted { iterations: 2 });
    }
}
