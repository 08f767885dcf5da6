//! Conversation transcript for interactive sessions.

use loopwright_agent::RunReport;
use serde::{Deserialize, Serialize};
use std::path::Path;

const NO_REPLY: &str = "The agent gave no explicit reply";

/// One user message and the run it started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub user_input: String,
    pub agent_response: String,
    pub status: String,
    /// Export records of the run's history.
    pub events: Vec<serde_json::Value>,
}

#[derive(Debug, Default)]
pub struct Session {
    exchanges: Vec<Exchange>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        user_input: &str,
        report: &RunReport,
    ) -> Result<&Exchange, loopwright_core::Error> {
        let exchange = Exchange {
            user_input: user_input.to_string(),
            agent_response: agent_response(report),
            status: report.status.label().to_string(),
            events: loopwright_core::export::to_records(report.events())?,
        };
        self.exchanges.push(exchange);
        Ok(&self.exchanges[self.exchanges.len() - 1])
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Write the transcript as a pretty-printed JSON array.
    pub fn save(&self, path: &Path) -> Result<(), loopwright_core::Error> {
        let json = serde_json::to_string_pretty(&self.exchanges)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// The agent's last message, else the text of its finish outputs.
pub fn agent_response(report: &RunReport) -> String {
    if let Some(text) = report.last_message() {
        return text.to_string();
    }
    report
        .outputs()
        .and_then(|outputs| {
            ["response", "result"]
                .iter()
                .find_map(|key| outputs.get(*key).and_then(|v| v.as_str()))
        })
        .unwrap_or(NO_REPLY)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopwright_agent::AgentController;
    use loopwright_core::clock::ManualClock;
    use loopwright_core::event::Action;
    use loopwright_policies::ScriptedPolicy;
    use loopwright_runtime::SimulatedRuntime;
    use std::sync::Arc;

    async fn report_for(actions: Vec<Action>) -> RunReport {
        AgentController::new(
            Arc::new(ScriptedPolicy::from_actions(actions)),
            Arc::new(SimulatedRuntime::new()),
        )
        .with_clock(Arc::new(ManualClock::starting_at_fixed_instant()))
        .run("hello", 5)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn response_prefers_last_message() {
        let report = report_for(vec![
            Action::send_message("first"),
            Action::send_message("second"),
            Action::finish([("result", "done")]),
        ])
        .await;
        assert_eq!(agent_response(&report), "second");
    }

    #[tokio::test]
    async fn response_falls_back_to_finish_outputs() {
        let report = report_for(vec![
            Action::run_command("pwd"),
            Action::finish([("result", "Done, the task is complete.")]),
        ])
        .await;
        assert_eq!(agent_response(&report), "Done, the task is complete.");
    }

    #[tokio::test]
    async fn response_when_nothing_was_said() {
        let report = report_for(vec![Action::run_command("pwd")]).await;
        assert_eq!(agent_response(&report), NO_REPLY);
    }

    #[tokio::test]
    async fn transcript_round_trips_through_file() {
        let report = report_for(vec![
            Action::send_message("hi"),
            Action::finish([("status", "completed")]),
        ])
        .await;

        let mut session = Session::new();
        let exchange = session.record("hello", &report).unwrap();
        assert_eq!(exchange.status, "finished");
        assert_eq!(exchange.events.len(), 3);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        session.save(&path).unwrap();

        let saved: Vec<Exchange> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].user_input, "hello");
        assert_eq!(saved[0].agent_response, "hi");
        assert_eq!(saved[0].events[0]["kind"], "send_message");
    }
}
