//! `loopwright run`: one task, start to finish.

use loopwright_agent::RunStatus;
use std::path::PathBuf;

use super::{
    build_controller, ctrl_c, load_config, print_status, run_until_interrupted, settle_printer,
    spawn_trace_printer,
};

pub async fn run(
    task: String,
    max_iterations: Option<u32>,
    policy: Option<String>,
    export: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(policy)?;
    let max_iterations = max_iterations.unwrap_or(config.agent.max_iterations);
    let (controller, bus) = build_controller(&config)?;

    // Ctrl+C stops the run before its next iteration.
    let printer = spawn_trace_printer(bus.subscribe());
    let outcome = run_until_interrupted(&controller, &task, max_iterations, ctrl_c()).await;
    settle_printer(printer, &outcome).await;
    let report = outcome?;

    print_status(&report);

    if let Some(path) = export {
        loopwright_core::export::write_json_file(&path, report.events())?;
        println!("💾 History written to {}", path.display());
    }

    match &report.status {
        RunStatus::Aborted { reason } => Err(format!("Run aborted: {reason}").into()),
        RunStatus::Finished { .. } | RunStatus::BudgetExhausted { .. } => Ok(()),
    }
}
