//! `loopwright chat`: interactive session, one run per message.

use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{
    build_controller, ctrl_c, load_config, print_status, run_until_interrupted, settle_printer,
    spawn_trace_printer,
};
use crate::session::Session;

const HELP: &str = "
🆘 Help

Try for example:
  - \"执行 ls 命令\"            run a shell command
  - \"创建一个文件\"            create or edit a file
  - \"你好\"                    small talk
  - \"完成任务\"                finish the task
  - \"计算 2 + 3 * 4\"          calculation (assistant policy)
  - \"北京的天气怎么样？\"      weather lookup (assistant policy)

Type 'quit' or 'exit' to leave.
";

pub async fn run(
    max_iterations: u32,
    policy: Option<String>,
    save: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(policy)?;
    let (controller, bus) = build_controller(&config)?;
    let mut session = Session::new();

    println!();
    println!("  🎯 Loopwright interactive session");
    println!("  Policy:  {}", controller.policy_name());
    println!("  Runtime: {}", controller.runtime_name());
    println!("  Type 'help' for examples, 'quit' or 'exit' to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = ctrl_c() => {
                println!("\n  Interrupted.");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let input = line.trim();
        match input.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("{HELP}");
                continue;
            }
            _ => {}
        }

        let printer = spawn_trace_printer(bus.subscribe());
        // Ctrl+C here cancels this run only; the session continues.
        let outcome = run_until_interrupted(&controller, input, max_iterations, ctrl_c()).await;
        settle_printer(printer, &outcome).await;

        match outcome {
            Ok(report) => {
                print_status(&report);
                let exchange = session.record(input, &report)?;
                println!();
                println!("  Agent > {}", exchange.agent_response);
                println!();
            }
            Err(e) => eprintln!("  [Error] {e}"),
        }
    }

    println!("  👋 Goodbye!");

    if let Some(path) = save {
        if session.is_empty() {
            println!("  Nothing to save.");
        } else {
            session.save(&path)?;
            println!(
                "  💾 {} exchange(s) saved to {}",
                session.exchanges().len(),
                path.display()
            );
        }
    }

    Ok(())
}
