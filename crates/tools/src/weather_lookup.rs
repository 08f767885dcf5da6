//! Weather lookup tool: answers from a fixed table of cities.
//!
//! There is no network access: the table is the whole data source, so the
//! tool is deterministic and usable in tests. Cities are matched by their
//! Chinese or English name, case-insensitively.

use async_trait::async_trait;
use loopwright_core::error::ToolError;
use loopwright_core::tool::{Tool, ToolResult};
use serde::Serialize;

pub struct WeatherLookupTool;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WeatherReport {
    pub city: &'static str,
    pub temperature: &'static str,
    pub condition: &'static str,
    pub humidity: &'static str,
}

/// (Chinese name, English name, report)
const TABLE: &[(&str, &str, WeatherReport)] = &[
    (
        "北京",
        "beijing",
        WeatherReport {
            city: "Beijing",
            temperature: "22°C",
            condition: "Sunny",
            humidity: "45%",
        },
    ),
    (
        "上海",
        "shanghai",
        WeatherReport {
            city: "Shanghai",
            temperature: "25°C",
            condition: "Cloudy",
            humidity: "60%",
        },
    ),
    (
        "深圳",
        "shenzhen",
        WeatherReport {
            city: "Shenzhen",
            temperature: "28°C",
            condition: "Light rain",
            humidity: "75%",
        },
    ),
];

/// Look a city up in the table.
pub fn lookup(city: &str) -> Option<WeatherReport> {
    let needle = city.trim().to_lowercase();
    TABLE
        .iter()
        .find(|(zh, en, _)| needle == *zh || needle == *en)
        .map(|(_, _, report)| *report)
}

#[async_trait]
impl Tool for WeatherLookupTool {
    fn name(&self) -> &str {
        "weather_lookup"
    }

    fn description(&self) -> &str {
        "Look up the current weather for a city. Returns temperature, condition and humidity."
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let city = arguments["city"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'city' argument".into()))?;

        Ok(match lookup(city) {
            Some(report) => ToolResult::ok(
                format!(
                    "{}: {}, {}, humidity {}",
                    report.city, report.temperature, report.condition, report.humidity
                ),
                serde_json::json!(report),
            ),
            None => ToolResult::failed(format!("No weather information for city '{city}'")),
        })
    }
}
