//! Weather Core Tool
//!
//! Looks up current conditions and a short forecast from wttr.in and renders
//! them as text for the agent. Needs no credentials, so it runs entirely
//! inside the sandbox.

pub mod client;
pub mod report;

use async_trait::async_trait;
use sdk::{CoreContext, CoreTool, EngineError, ToolError, ToolInput, ToolOutput};
use tracing::{info, warn};

pub use client::WeatherClient;
pub use report::{format_report, WeatherReport, MAX_FORECAST_DAYS};

/// Weather lookup tool
pub struct WeatherTool {
    client: WeatherClient,
    started: bool,
}

impl WeatherTool {
    pub fn new(client: WeatherClient) -> Self {
        Self {
            client,
            started: false,
        }
    }

    /// Fetch and format the weather for `location`.
    ///
    /// Every failure is turned into user-facing text.
    pub async fn get_weather(&self, location: &str, days: i64) -> ToolOutput {
        match self.client.fetch(location).await {
            Ok(report) => ToolOutput::text(format_report(&report, location, days)),
            Err(e) => {
                warn!("Weather lookup for {} failed: {:#}", location, e);
                ToolOutput::error(format!(
                    "Failed to fetch weather for {}: {:#}",
                    location, e
                ))
            }
        }
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new(WeatherClient::default())
    }
}

#[async_trait]
impl CoreTool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Current weather and a 1-3 day forecast for a location"
    }

    fn start(&mut self, ctx: CoreContext) -> Result<(), EngineError> {
        info!(group = %ctx.group, "Weather tool started");
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.started = false;
        info!("Weather tool stopped");
        Ok(())
    }

    async fn handle(&self, input: ToolInput) -> Result<ToolOutput, EngineError> {
        if !self.started {
            return Err(EngineError::ToolError("weather tool not started".to_string()));
        }
        if input.method != "get_weather" {
            return Err(ToolError::UnknownMethod(input.method).into());
        }

        let location = input.param_str("location")?;
        let location = location.trim();
        if location.is_empty() {
            return Err(ToolError::InvalidParameter("location must not be empty".to_string()).into());
        }
        let days = input
            .param_i64_opt("days")
            .unwrap_or(MAX_FORECAST_DAYS as i64);

        Ok(self.get_weather(location, days).await)
    }
}
