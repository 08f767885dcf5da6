//! Built-in tools for Loopwright decision policies.
//!
//! Both tools are pure: the calculator evaluates arithmetic without `eval`
//! and the weather lookup answers from a fixed table.

pub mod calculator;
pub mod weather_lookup;

use loopwright_core::tool::ToolRegistry;

pub use calculator::CalculatorTool;
pub use weather_lookup::WeatherLookupTool;

/// Create a registry with every built-in tool.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CalculatorTool));
    registry.register(Box::new(WeatherLookupTool));
    tracing::debug!(tools = ?registry.names(), "Built default tool registry");
    registry
}
