//! Tool-assisted assistant policy.
//!
//! On the first decision of a run the task is classified as a calculation,
//! a weather question, or anything else. The matching tool is consulted and
//! its answer sent as a message. Once that message has been observed the
//! run finishes with the reply as its `response` output.

use async_trait::async_trait;
use loopwright_core::error::PolicyError;
use loopwright_core::event::Action;
use loopwright_core::policy::DecisionPolicy;
use loopwright_core::state::State;
use loopwright_core::tool::ToolRegistry;
use tracing::debug;

const CALCULATOR: &str = "calculator";
const WEATHER: &str = "weather_lookup";

const CALC_KEYWORDS: &[&str] = &[
    "calculate", "compute", "计算", "算", "+", "-", "*", "/", "等于", "加", "减", "乘", "除",
];
const WEATHER_KEYWORDS: &[&str] = &["weather", "temperature", "天气", "温度", "下雨", "晴天", "多云"];

/// Cities recognised in weather questions, Chinese and English spellings.
const CITIES: &[&str] = &[
    "北京", "上海", "深圳", "广州", "杭州", "beijing", "shanghai", "shenzhen", "guangzhou",
    "hangzhou",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Calculation,
    Weather,
    Other,
}

/// Classify a task. Calculation keywords are checked first.
pub fn classify(task: &str) -> Intent {
    let lower = task.to_lowercase();
    if CALC_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Intent::Calculation
    } else if WEATHER_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Intent::Weather
    } else {
        Intent::Other
    }
}

/// The longest run of arithmetic characters that contains a digit.
pub fn extract_expression(text: &str) -> Option<String> {
    let is_math = |c: char| c.is_ascii_digit() || "+-*/().".contains(c) || c.is_whitespace();

    text.split(|c: char| !is_math(c))
        .map(str::trim)
        .filter(|s| s.chars().any(|c| c.is_ascii_digit()))
        .max_by_key(|s| s.len())
        .map(str::to_string)
}

/// The first known city mentioned in `text`.
pub fn extract_city(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    CITIES.iter().copied().find(|city| lower.contains(city))
}

pub struct AssistantPolicy {
    name: String,
    tools: ToolRegistry,
}

impl AssistantPolicy {
    pub fn new(name: impl Into<String>, tools: ToolRegistry) -> Self {
        Self {
            name: name.into(),
            tools,
        }
    }

    /// Produce the reply text for `task`, consulting tools as needed.
    pub async fn respond(&self, task: &str) -> Result<String, PolicyError> {
        match classify(task) {
            Intent::Calculation => self.calculate(task).await,
            Intent::Weather => self.weather(task).await,
            Intent::Other => Ok(format!(
                "Hello! I'm {}. I can do calculations or look up the weather. What do you need?",
                self.name
            )),
        }
    }

    async fn calculate(&self, task: &str) -> Result<String, PolicyError> {
        if !self.tools.contains(CALCULATOR) {
            return Ok("Sorry, the calculator tool is not available.".into());
        }
        let Some(expression) = extract_expression(task) else {
            return Ok("Please give me a valid arithmetic expression, e.g. 2 + 3 * 4".into());
        };

        let result = self
            .tools
            .execute(CALCULATOR, serde_json::json!({ "expression": expression }))
            .await
            .map_err(|e| PolicyError::Internal(e.to_string()))?;

        debug!(expression = %expression, success = result.success, "Consulted calculator");
        Ok(if result.success {
            format!("Result: {expression} = {}", result.output)
        } else {
            result.output
        })
    }

    async fn weather(&self, task: &str) -> Result<String, PolicyError> {
        if !self.tools.contains(WEATHER) {
            return Ok("Sorry, the weather lookup tool is not available.".into());
        }
        let Some(city) = extract_city(task) else {
            return Ok("Please name a city, e.g. \"What's the weather in Beijing?\"".into());
        };

        let result = self
            .tools
            .execute(WEATHER, serde_json::json!({ "city": city }))
            .await
            .map_err(|e| PolicyError::Internal(e.to_string()))?;

        debug!(city, success = result.success, "Consulted weather lookup");
        Ok(if result.success {
            format!("Weather in {}", result.output)
        } else {
            format!("Lookup failed: {}", result.output)
        })
    }
}

#[async_trait]
impl DecisionPolicy for AssistantPolicy {
    fn name(&self) -> &str {
        "assistant"
    }

    async fn next(&self, state: &State) -> Result<Action, PolicyError> {
        if state.is_empty() {
            let reply = self.respond(state.task()).await?;
            return Ok(Action::send_message(reply));
        }

        let response = state
            .actions()
            .filter_map(|action| match action {
                Action::SendMessage { text } => Some(text.clone()),
                Action::RunCommand { .. } | Action::EditFile { .. } | Action::Finish { .. } => {
                    None
                }
            })
            .last()
            .unwrap_or_default();

        let delivered = state
            .last_observation()
            .and_then(|e| e.as_observation())
            .is_some_and(|o| !o.is_failure());
        let status = if delivered { "completed" } else { "failed" };

        Ok(Action::finish([
            ("response", serde_json::Value::from(response)),
            ("status", serde_json::Value::from(status)),
        ]))
    }
}
