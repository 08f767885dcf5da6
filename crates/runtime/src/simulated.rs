//! Simulated runtime: canned command output and an in-memory file store.

use async_trait::async_trait;
use loopwright_config::RuntimeConfig;
use loopwright_core::clock::{Clock, SystemClock};
use loopwright_core::error::RuntimeFault;
use loopwright_core::event::{Action, ActionKind, Observation};
use loopwright_core::runtime::ExecutionRuntime;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::commands::CommandTable;
use crate::file_store::FileStore;

/// Answers every action without side effects outside its [`FileStore`].
///
/// ```text
/// SendMessage(text)   -> CommandOutput("message", "Message sent: {text}", 0)
/// RunCommand(cmd)     -> CommandOutput(cmd, <canned output>, 0)
/// EditFile(path, ..)  -> FileContent(path, "File {path} written successfully")
/// Finish / disabled   -> Failure(unsupported-action)
/// ```
pub struct SimulatedRuntime {
    commands: CommandTable,
    store: FileStore,
    disabled: BTreeSet<ActionKind>,
    clock: Arc<dyn Clock>,
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self {
            commands: CommandTable::builtin(),
            store: FileStore::new(),
            disabled: BTreeSet::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build from the `[runtime]` config section.
    ///
    /// Unknown names in `disabled_actions` are logged and ignored.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let mut runtime = Self::new();
        runtime.commands.extend(config.commands.clone());
        if let Some(max) = config.max_files {
            runtime.store = FileStore::with_capacity_limit(max);
        }
        for name in &config.disabled_actions {
            match name.parse::<ActionKind>() {
                Ok(kind) => {
                    runtime.disabled.insert(kind);
                }
                Err(e) => warn!(action = %name, error = %e, "Ignoring unknown disabled action"),
            }
        }
        runtime
    }

    /// Clock used to render `date`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_store(mut self, store: FileStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_commands(mut self, commands: CommandTable) -> Self {
        self.commands = commands;
        self
    }

    /// Answer `kind` with `Failure(unsupported-action)` from now on.
    pub fn with_disabled(mut self, kind: ActionKind) -> Self {
        self.disabled.insert(kind);
        self
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn supports(&self, kind: ActionKind) -> bool {
        kind != ActionKind::Finish && !self.disabled.contains(&kind)
    }
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionRuntime for SimulatedRuntime {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn execute(&self, action: &Action) -> Result<Observation, RuntimeFault> {
        let kind = action.kind();
        if !self.supports(kind) {
            debug!(action = %kind, "Action not supported by simulated runtime");
            return Ok(Observation::unsupported(kind));
        }

        let observation = match action {
            Action::SendMessage { text } => {
                Observation::command_output("message", format!("Message sent: {text}"), 0)
            }
            Action::RunCommand { command } => {
                let output = self.commands.respond(command, self.clock.now());
                debug!(command = %command, "Simulated command");
                Observation::command_output(command.as_str(), output, 0)
            }
            Action::EditFile { path, content } => {
                self.store.write(path, content).await?;
                debug!(path = %path, bytes = content.len(), "Simulated file write");
                Observation::file_content(path.as_str(), format!("File {path} written successfully"))
            }
            Action::Finish { .. } => Observation::unsupported(kind),
        };

        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopwright_core::clock::ManualClock;
    use loopwright_core::event::FailureCategory;

    #[tokio::test]
    async fn send_message_is_echoed() {
        let obs = SimulatedRuntime::new()
            .execute(&Action::send_message("hi"))
            .await
            .unwrap();
        assert_eq!(obs, Observation::command_output("message", "Message sent: hi", 0));
    }

    #[tokio::test]
    async fn run_command_uses_table() {
        let obs = SimulatedRuntime::new()
            .execute(&Action::run_command("pwd"))
            .await
            .unwrap();
        assert_eq!(obs, Observation::command_output("pwd", "/tmp", 0));
    }

    #[tokio::test]
    async fn date_uses_injected_clock() {
        let runtime = SimulatedRuntime::new().with_clock(Arc::new(ManualClock::starting_at_fixed_instant()));
        let obs = runtime.execute(&Action::run_command("date")).await.unwrap();
        assert_eq!(obs.content(), "2024-01-01 00:00:00");
    }

    #[tokio::test]
    async fn edit_file_records_content() {
        let runtime = SimulatedRuntime::new();
        let obs = runtime
            .execute(&Action::edit_file("/tmp/out.txt", "body"))
            .await
            .unwrap();
        assert_eq!(
            obs,
            Observation::file_content("/tmp/out.txt", "File /tmp/out.txt written successfully")
        );
        assert_eq!(runtime.store().read("/tmp/out.txt").await.as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn finish_is_unsupported() {
        let obs = SimulatedRuntime::new()
            .execute(&Action::finish([("status", "done")]))
            .await
            .unwrap();
        assert_eq!(obs, Observation::unsupported(ActionKind::Finish));
    }

    #[tokio::test]
    async fn disabled_kind_is_unsupported() {
        let runtime = SimulatedRuntime::new().with_disabled(ActionKind::EditFile);
        let obs = runtime
            .execute(&Action::edit_file("/tmp/x", "y"))
            .await
            .unwrap();
        assert_eq!(
            obs,
            Observation::Failure {
                message: "Unsupported action: edit_file".into(),
                category: FailureCategory::UnsupportedAction,
            }
        );
        assert!(runtime.store().is_empty().await);
    }

    #[tokio::test]
    async fn full_store_is_a_fault() {
        let runtime = SimulatedRuntime::new().with_store(FileStore::with_capacity_limit(1));
        runtime.execute(&Action::edit_file("/tmp/a", "1")).await.unwrap();
        let fault = runtime
            .execute(&Action::edit_file("/tmp/b", "2"))
            .await
            .unwrap_err();
        assert!(matches!(fault, RuntimeFault::ResourceExhausted(_)));
        assert!(fault.is_representable());
    }

    #[tokio::test]
    async fn from_config_applies_every_setting() {
        let mut config = RuntimeConfig::default();
        config.disabled_actions = vec!["run_command".into(), "teleport".into()];
        config.max_files = Some(2);
        config.commands.insert("whoami".into(), "agent".into());

        let runtime = SimulatedRuntime::from_config(&config);
        assert!(!runtime.supports(ActionKind::RunCommand));
        assert!(runtime.supports(ActionKind::SendMessage));
        assert_eq!(runtime.store().max_files(), Some(2));

        let obs = runtime.execute(&Action::run_command("whoami")).await.unwrap();
        assert!(obs.is_failure());
    }

    #[tokio::test]
    async fn shared_store_across_runtimes() {
        let store = FileStore::new();
        let a = SimulatedRuntime::new().with_store(store.clone());
        let b = SimulatedRuntime::new().with_store(store.clone());
        a.execute(&Action::edit_file("/tmp/1", "a")).await.unwrap();
        b.execute(&Action::edit_file("/tmp/2", "b")).await.unwrap();
        assert_eq!(store.len().await, 2);
    }
}
