use sdk::{CoreContext, CoreTool, EngineError, ToolInput, ToolOutput};
use std::time::Duration;
use telegram::TelegramCommandsTool;
use tracing::{debug, info, warn};
use weather::{WeatherClient, WeatherTool};

use crate::config::Config;

/// Registry of the core tools exposed to the sandboxed agent.
///
/// Tools are dispatched by name. A tool only answers after `start_all` has
/// handed it a [`CoreContext`].
pub struct ToolRegistry {
    tools: Vec<Box<dyn CoreTool>>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with the built-in tools, configured from `config`
    pub fn with_defaults(config: &Config) -> Self {
        let weather_client = WeatherClient::new(
            config.weather.base_url.clone(),
            Duration::from_secs(config.weather.timeout_secs),
        );

        let mut registry = Self::empty();
        registry.register(Box::new(TelegramCommandsTool::new()));
        registry.register(Box::new(WeatherTool::new(weather_client)));
        registry
    }

    /// Add a tool; a tool with the same name is replaced
    pub fn register(&mut self, tool: Box<dyn CoreTool>) {
        if let Some(pos) = self.tools.iter().position(|t| t.name() == tool.name()) {
            warn!("Replacing already registered tool '{}'", tool.name());
            self.tools[pos] = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Start every tool with a copy of `ctx`
    pub fn start_all(&mut self, ctx: &CoreContext) -> Result<(), EngineError> {
        for tool in &mut self.tools {
            tool.start(ctx.clone())?;
        }
        info!(
            group = %ctx.group,
            is_main = ctx.is_main,
            "Started {} tool(s)",
            self.tools.len()
        );
        Ok(())
    }

    /// Stop every tool, logging failures
    pub fn stop_all(&mut self) {
        for tool in &mut self.tools {
            if let Err(e) = tool.stop() {
                warn!("Failed to stop tool '{}': {}", tool.name(), e);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn CoreTool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Dispatch a call to the named tool.
    ///
    /// Unknown tools are `ToolNotFound`; unknown methods surface as the
    /// tool's own `UnknownOperation` error.
    pub async fn dispatch(&self, name: &str, input: ToolInput) -> Result<ToolOutput, EngineError> {
        debug!("Dispatching {}.{}", name, input.method);

        let Some(tool) = self.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return Err(EngineError::ToolNotFound(format!(
                "{} (available: {})",
                name,
                self.tool_names().join(", ")
            )));
        };

        tool.handle(input).await
    }

    /// Names of all registered tools, in registration order
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// `(name, version, description)` for every registered tool
    pub fn describe(&self) -> Vec<(&str, &str, &str)> {
        self.tools
            .iter()
            .map(|t| (t.name(), t.version(), t.description()))
            .collect()
    }
}
