//! HTTP client for the wttr.in JSON endpoint

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

use crate::report::WeatherReport;

/// Default public endpoint
pub const DEFAULT_BASE_URL: &str = "https://wttr.in";

#[derive(Debug, Clone)]
pub struct WeatherClient {
    base_url: String,
    client: Client,
}

impl WeatherClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// `{base_url}/{location}?format=j1`, with the location percent-encoded
    /// as a single path segment.
    pub fn report_url(&self, location: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid weather base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Weather base URL cannot have a path: {}", self.base_url))?
            .pop_if_empty()
            .push(location);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }

    /// Fetch the raw report for `location`
    pub async fn fetch(&self, location: &str) -> Result<WeatherReport> {
        let url = self.report_url(location)?;
        debug!("Fetching weather from {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("weather service returned HTTP {}", status));
        }

        let report = response
            .json::<WeatherReport>()
            .await
            .context("unexpected response format")?;
        Ok(report)
    }
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Duration::from_secs(15))
    }
}
