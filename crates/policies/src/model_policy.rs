//! Model-driven decision policy.
//!
//! Each decision renders the task and the recent history as a chat
//! conversation, asks a [`ChatModel`] for a reply, and maps the reply text
//! onto an [`Action`] by keyword.

use async_trait::async_trait;
use loopwright_core::clock::{Clock, SystemClock};
use loopwright_core::error::PolicyError;
use loopwright_core::event::{Action, Event, EventPayload, Observation};
use loopwright_core::policy::DecisionPolicy;
use loopwright_core::state::State;
use std::sync::Arc;
use tracing::debug;

use crate::chat::{ChatMessage, ChatModel};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful agent. You can:
1. Run shell commands
2. Read and edit files
3. Talk with the user
4. Finish the task you were given

Choose the operation that fits the user's request.";

/// Events included in each prompt.
pub const HISTORY_WINDOW: usize = 10;

/// Where file-keyword replies are written.
pub const OUTPUT_PATH: &str = "/tmp/agent_output.txt";

/// Observation bodies are cut to this many characters in the prompt.
const OBSERVATION_PREVIEW: usize = 200;

const RUN_KEYWORDS: &[&str] = &["run", "execute", "命令", "执行"];
const FILE_KEYWORDS: &[&str] = &["file", "edit", "write", "文件", "编辑"];
const FINISH_KEYWORDS: &[&str] = &["finish", "done", "complete", "完成"];

pub struct ModelPolicy<M: ChatModel> {
    model: M,
    system_prompt: String,
    clock: Arc<dyn Clock>,
}

impl<M: ChatModel> ModelPolicy<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Clock used for the timestamp written into file edits.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// System prompt, the task, then the last [`HISTORY_WINDOW`] events.
    pub fn build_messages(&self, state: &State) -> Vec<ChatMessage> {
        let mut messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(state.task()),
        ];
        messages.extend(state.recent(HISTORY_WINDOW).iter().map(render_event));
        messages
    }

    /// Map reply text to an action. Command keywords win over file
    /// keywords, which win over finish keywords.
    pub fn parse_reply(&self, reply: &str) -> Action {
        let lower = reply.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));

        if has(RUN_KEYWORDS) {
            let command = if lower.contains("ls") {
                "ls -la"
            } else if lower.contains("pwd") {
                "pwd"
            } else if lower.contains("date") {
                "date"
            } else {
                "echo 'Hello from custom agent'"
            };
            Action::run_command(command)
        } else if has(FILE_KEYWORDS) {
            Action::edit_file(
                OUTPUT_PATH,
                format!(
                    "Agent response: {reply}\nTimestamp: {}",
                    self.clock.now().to_rfc3339()
                ),
            )
        } else if has(FINISH_KEYWORDS) {
            Action::finish([
                ("result", serde_json::Value::from(reply)),
                ("status", serde_json::Value::from("completed")),
            ])
        } else {
            Action::send_message(reply)
        }
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() > OBSERVATION_PREVIEW {
        let cut: String = content.chars().take(OBSERVATION_PREVIEW).collect();
        format!("{cut}...")
    } else {
        content.to_string()
    }
}

fn render_event(event: &Event) -> ChatMessage {
    match &event.payload {
        EventPayload::Action(action) => ChatMessage::assistant(match action {
            Action::SendMessage { text } => text.clone(),
            Action::RunCommand { command } => format!("Running command: {command}"),
            Action::EditFile { path, .. } => format!("Editing file: {path}"),
            Action::Finish { .. } => "Finished.".to_string(),
        }),
        EventPayload::Observation(observation) => ChatMessage::tool(match observation {
            Observation::CommandOutput {
                command, content, ..
            } => format!("Output of '{command}': {}", preview(content)),
            Observation::FileContent { path, content } => {
                format!("{path}: {}", preview(content))
            }
            Observation::Failure { message, category } => format!("Error ({category}): {message}"),
        }),
    }
}

#[async_trait]
impl<M: ChatModel> DecisionPolicy for ModelPolicy<M> {
    fn name(&self) -> &str {
        self.model.name()
    }

    async fn next(&self, state: &State) -> Result<Action, PolicyError> {
        let messages = self.build_messages(state);
        let reply = self.model.complete(&messages).await?;
        let action = self.parse_reply(&reply.content);
        debug!(model = %reply.model, action = %action.kind(), "Model decided");
        Ok(action)
    }
}
