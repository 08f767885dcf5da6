//! Keyword-matching chat model. No network, fully deterministic.

use async_trait::async_trait;
use loopwright_core::error::PolicyError;

use crate::chat::{ChatMessage, ChatModel, ChatRole, ModelReply};

const GREETING: &[&str] = &["hello", "你好"];
const FILE: &[&str] = &["file", "文件"];
const RUN: &[&str] = &["run", "execute", "执行"];
const FINISH: &[&str] = &["finish", "完成"];

/// Replies to the last message by keyword.
///
/// Once the environment has reported back (last message has the tool role)
/// it always declares the task done, so a loop driven by it terminates.
pub struct MockChatModel {
    model: String,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self {
            model: "mock-model".into(),
        }
    }

    fn reply_to(&self, last: &ChatMessage) -> String {
        if last.role == ChatRole::Tool {
            return "Done, the task is complete.".into();
        }

        let text = last.content.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| text.contains(k));

        if has(GREETING) {
            "Hello! I'm a custom agent, happy to help you.".into()
        } else if has(FILE) {
            "I can help with files. Saving the result to a file now.".into()
        } else if has(RUN) {
            format!("I can execute commands. Request: {}", last.content)
        } else if has(FINISH) {
            "OK, the task is complete.".into()
        } else {
            format!("I understand your request: {}. Let me handle it.", last.content)
        }
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, PolicyError> {
        let content = match messages.last() {
            Some(last) => self.reply_to(last),
            None => "I need more information to help you.".into(),
        };
        Ok(ModelReply {
            content,
            model: self.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn reply(messages: &[ChatMessage]) -> String {
        MockChatModel::new().complete(messages).await.unwrap().content
    }

    #[tokio::test]
    async fn empty_conversation() {
        assert_eq!(reply(&[]).await, "I need more information to help you.");
    }

    #[tokio::test]
    async fn greeting() {
        let text = reply(&[ChatMessage::user("你好，请介绍一下你自己")]).await;
        assert!(text.starts_with("Hello!"));
    }

    #[tokio::test]
    async fn run_request_carries_user_text() {
        let text = reply(&[ChatMessage::user("执行 ls 命令查看当前目录")]).await;
        assert!(text.contains("execute"));
        assert!(text.contains("ls"));
    }

    #[tokio::test]
    async fn file_beats_run() {
        let text = reply(&[ChatMessage::user("run something and write a file")]).await;
        assert!(text.contains("file"));
    }

    #[tokio::test]
    async fn tool_output_means_done() {
        let text = reply(&[
            ChatMessage::user("hello"),
            ChatMessage::tool("Message sent: hello"),
        ])
        .await;
        assert_eq!(text, "Done, the task is complete.");
    }

    #[tokio::test]
    async fn fallback_echoes_request() {
        let text = reply(&[ChatMessage::user("tell me a story")]).await;
        assert_eq!(text, "I understand your request: tell me a story. Let me handle it.");
    }
}
