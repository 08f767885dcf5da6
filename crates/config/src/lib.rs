//! Configuration loading, validation, and management for Loopwright.
//!
//! Loads configuration from `~/.loopwright/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which decision policy drives the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Keyword-matching mock model (no network)
    #[default]
    Mock,
    /// OpenAI-compatible chat completions endpoint
    Openai,
    /// Tool-assisted assistant (calculator + weather lookup)
    Assistant,
}

impl std::str::FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mock" => Ok(Self::Mock),
            "openai" => Ok(Self::Openai),
            "assistant" => Ok(Self::Assistant),
            other => Err(ConfigError::ValidationError(format!(
                "unknown policy '{other}' (expected mock, openai or assistant)"
            ))),
        }
    }
}

/// The root configuration structure.
///
/// Maps directly to `~/.loopwright/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Decision policy
    #[serde(default)]
    pub policy: PolicyKind,

    /// Model name sent to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Provider base URL (OpenAI-compatible)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Controller settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Simulated runtime settings
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_temperature() -> f32 {
    0.7
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("policy", &self.policy)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("agent", &self.agent)
            .field("runtime", &self.runtime)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum loop passes per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Deadline for one policy decision; unset means no deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_timeout_secs: Option<u64>,

    /// Deadline for one runtime execution; unset means no deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_timeout_secs: Option<u64>,

    /// Overrides the policy's built-in system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Display name used by the assistant policy
    #[serde(default = "default_agent_name")]
    pub name: String,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_agent_name() -> String {
    "Loopwright".into()
}

impl AgentConfig {
    pub fn policy_timeout(&self) -> Option<Duration> {
        self.policy_timeout_secs.map(Duration::from_secs)
    }

    pub fn runtime_timeout(&self) -> Option<Duration> {
        self.runtime_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            policy_timeout_secs: None,
            runtime_timeout_secs: None,
            system_prompt: None,
            name: default_agent_name(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Action kinds the runtime answers with an unsupported-action failure
    /// (e.g. `["edit_file"]`)
    #[serde(default)]
    pub disabled_actions: Vec<String>,

    /// Maximum number of distinct paths the file store accepts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,

    /// Extra canned command responses, keyed by exact command string
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.loopwright/config.toml).
    ///
    /// Environment overrides:
    /// - `LOOPWRIGHT_API_KEY`, then `OPENAI_API_KEY` (only if no key in file)
    /// - `LOOPWRIGHT_POLICY`
    /// - `LOOPWRIGHT_MODEL`
    /// - `LOOPWRIGHT_MAX_ITERATIONS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injected for tests).
    fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            self.api_key = lookup("LOOPWRIGHT_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(policy) = lookup("LOOPWRIGHT_POLICY") {
            self.policy = policy.parse()?;
        }

        if let Some(model) = lookup("LOOPWRIGHT_MODEL") {
            self.model = model;
        }

        if let Some(max) = lookup("LOOPWRIGHT_MAX_ITERATIONS") {
            self.agent.max_iterations = max.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "LOOPWRIGHT_MAX_ITERATIONS must be a positive integer, got '{max}'"
                ))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".loopwright")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.policy_timeout_secs == Some(0) || self.agent.runtime_timeout_secs == Some(0)
        {
            return Err(ConfigError::ValidationError(
                "agent timeouts must be positive when set".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.runtime.max_files == Some(0) {
            return Err(ConfigError::ValidationError(
                "runtime.max_files must be positive when set".into(),
            ));
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            policy: PolicyKind::default(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            agent: AgentConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy, PolicyKind::Mock);
        assert_eq!(config.agent.max_iterations, 10);
        assert!(config.agent.policy_timeout().is_none());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.agent.max_iterations, config.agent.max_iterations);
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.agent.runtime_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_temperature_rejected() {
        let config = AppConfig {
            temperature: f32::NAN,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.policy, PolicyKind::Mock);
    }

    #[test]
    fn parses_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
policy = "assistant"
model = "local-model"

[agent]
max_iterations = 4
policy_timeout_secs = 30
runtime_timeout_secs = 5

[runtime]
disabled_actions = ["edit_file"]
max_files = 16

[runtime.commands]
"whoami" = "agent"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.policy, PolicyKind::Assistant);
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.agent.runtime_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.runtime.disabled_actions, vec!["edit_file".to_string()]);
        assert_eq!(config.runtime.commands.get("whoami").map(String::as_str), Some("agent"));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "policy = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("LOOPWRIGHT_POLICY", "openai"),
            ("LOOPWRIGHT_MAX_ITERATIONS", "7"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.policy, PolicyKind::Openai);
        assert_eq!(config.agent.max_iterations, 7);
    }

    #[test]
    fn env_override_rejects_bad_values() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_env(|k| (k == "LOOPWRIGHT_POLICY").then(|| "oracle".to_string()))
            .is_err());

        let mut config = AppConfig::default();
        assert!(config
            .apply_env(|k| (k == "LOOPWRIGHT_MAX_ITERATIONS").then(|| "0".to_string()))
            .is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("mock"));
        assert!(toml_str.contains("max_iterations"));
    }
}
