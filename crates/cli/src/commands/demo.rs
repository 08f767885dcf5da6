//! `loopwright demo`: the built-in scenarios, one run each.

use super::{build_controller, load_config, print_status, settle_printer, spawn_trace_printer};

/// Greeting, directory listing, file creation, date, and an explicit finish.
pub const SCENARIOS: [&str; 5] = [
    "你好，请介绍一下你自己",
    "执行 ls 命令查看当前目录",
    "创建一个包含当前时间的文件",
    "执行 date 命令",
    "任务完成，请结束",
];

pub async fn run(
    max_iterations: u32,
    policy: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(policy)?;
    let (controller, bus) = build_controller(&config)?;

    println!("🎪 Loopwright demo ({} policy)", controller.policy_name());
    println!("{}", "=".repeat(60));

    for (i, scenario) in SCENARIOS.iter().enumerate() {
        println!("\n🎬 Scenario {}: {scenario}", i + 1);
        println!("{}", "-".repeat(40));

        let printer = spawn_trace_printer(bus.subscribe());
        let outcome = controller.run(*scenario, max_iterations).await;
        settle_printer(printer, &outcome).await;
        let report = outcome?;

        print_status(&report);
        println!("📈 Summary:");
        println!("   Actions:      {}", report.state.actions().count());
        println!("   Observations: {}", report.state.observations().count());
        println!("   Iterations:   {}", report.iterations());
    }

    Ok(())
}
