//! Decision policies for Loopwright.
//!
//! - [`ModelPolicy`] asks a [`ChatModel`] ([`MockChatModel`] or
//!   [`OpenAiChatModel`]) and maps the reply onto an action by keyword.
//! - [`AssistantPolicy`] answers calculation and weather tasks with tools.
//! - [`ScriptedPolicy`] replays a fixed list of decisions.
//!
//! [`build_from_config`] picks one from the loaded configuration.

pub mod assistant;
pub mod chat;
pub mod mock_model;
pub mod model_policy;
pub mod openai;
pub mod scripted;

use loopwright_config::{AppConfig, PolicyKind};
use loopwright_core::error::PolicyError;
use loopwright_core::policy::DecisionPolicy;
use std::sync::Arc;

pub use assistant::AssistantPolicy;
pub use chat::{ChatMessage, ChatModel, ChatRole, ModelReply};
pub use mock_model::MockChatModel;
pub use model_policy::ModelPolicy;
pub use openai::OpenAiChatModel;
pub use scripted::ScriptedPolicy;

/// Build the policy selected by `config.policy`.
///
/// The OpenAI policy needs an API key; without one this fails with
/// `PolicyError::Authentication` before any request is made.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn DecisionPolicy>, PolicyError> {
    let policy: Arc<dyn DecisionPolicy> = match config.policy {
        PolicyKind::Mock => Arc::new(with_prompt(
            ModelPolicy::new(MockChatModel::new()),
            config,
        )),
        PolicyKind::Openai => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                PolicyError::Authentication(
                    "No API key configured (set api_key or LOOPWRIGHT_API_KEY)".into(),
                )
            })?;
            let model = OpenAiChatModel::new(
                config.base_url.as_str(),
                api_key,
                config.model.as_str(),
                config.temperature,
            )?;
            Arc::new(with_prompt(ModelPolicy::new(model), config))
        }
        PolicyKind::Assistant => Arc::new(AssistantPolicy::new(
            config.agent.name.as_str(),
            loopwright_tools::default_registry(),
        )),
    };

    tracing::info!(policy = %policy.name(), "Decision policy ready");
    Ok(policy)
}

fn with_prompt<M: ChatModel>(policy: ModelPolicy<M>, config: &AppConfig) -> ModelPolicy<M> {
    match &config.agent.system_prompt {
        Some(prompt) => policy.with_system_prompt(prompt.as_str()),
        None => policy,
    }
}
