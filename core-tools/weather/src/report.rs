//! wttr.in `format=j1` payload and its text rendering

use serde::Deserialize;
use std::fmt::Write;

/// Most forecast days the source provides
pub const MAX_FORECAST_DAYS: usize = 3;

/// Index of the hourly sample used as the day's midday conditions
const MIDDAY_SAMPLE: usize = 4;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub current_condition: Vec<CurrentCondition>,
    #[serde(default)]
    pub nearest_area: Vec<NearestArea>,
    #[serde(default)]
    pub weather: Vec<DailyForecast>,
}

/// Wrapper wttr.in uses for every free-text field
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextValue {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CurrentCondition {
    #[serde(rename = "temp_C")]
    pub temp_c: String,
    #[serde(rename = "temp_F")]
    pub temp_f: String,
    #[serde(rename = "FeelsLikeC")]
    pub feels_like_c: String,
    #[serde(rename = "FeelsLikeF")]
    pub feels_like_f: String,
    pub humidity: String,
    #[serde(rename = "windspeedKmph")]
    pub windspeed_kmph: String,
    #[serde(rename = "winddir16Point")]
    pub winddir_16_point: String,
    pub pressure: String,
    pub visibility: String,
    pub cloudcover: String,
    #[serde(rename = "uvIndex")]
    pub uv_index: String,
    #[serde(rename = "weatherDesc")]
    pub weather_desc: Vec<TextValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NearestArea {
    #[serde(rename = "areaName")]
    pub area_name: Vec<TextValue>,
    pub region: Vec<TextValue>,
    pub country: Vec<TextValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DailyForecast {
    pub date: String,
    #[serde(rename = "maxtempC")]
    pub max_temp_c: String,
    #[serde(rename = "maxtempF")]
    pub max_temp_f: String,
    #[serde(rename = "mintempC")]
    pub min_temp_c: String,
    #[serde(rename = "mintempF")]
    pub min_temp_f: String,
    pub hourly: Vec<HourlySample>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HourlySample {
    #[serde(rename = "weatherDesc")]
    pub weather_desc: Vec<TextValue>,
    #[serde(rename = "chanceofrain")]
    pub chance_of_rain: String,
    #[serde(rename = "uvIndex")]
    pub uv_index: String,
}

fn first_text(values: &[TextValue]) -> &str {
    values
        .first()
        .map(|v| v.value.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or("Unknown")
}

/// Clamp a requested day count to what the source can provide
pub fn clamp_days(requested: i64, available: usize) -> usize {
    let requested = requested.clamp(1, MAX_FORECAST_DAYS as i64) as usize;
    requested.min(available)
}

impl NearestArea {
    fn label(&self) -> String {
        [&self.area_name, &self.region, &self.country]
            .iter()
            .filter_map(|v| v.first())
            .map(|v| v.value.trim())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl DailyForecast {
    /// The midday sample, or the latest one when the day has fewer samples
    fn midday(&self) -> Option<&HourlySample> {
        self.hourly.get(MIDDAY_SAMPLE).or_else(|| self.hourly.last())
    }
}

/// Render the report as a plain-text block for the agent.
///
/// `location` is used in the heading when the source names no area.
pub fn format_report(report: &WeatherReport, location: &str, days: i64) -> String {
    let mut out = String::new();

    let area = report
        .nearest_area
        .first()
        .map(NearestArea::label)
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| location.to_string());
    let _ = writeln!(out, "Weather for {}", area);

    if let Some(current) = report.current_condition.first() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Current conditions: {}", first_text(&current.weather_desc));
        let _ = writeln!(
            out,
            "Temperature: {}°C ({}°F), feels like {}°C ({}°F)",
            current.temp_c, current.temp_f, current.feels_like_c, current.feels_like_f
        );
        let _ = writeln!(out, "Humidity: {}%", current.humidity);
        let _ = writeln!(
            out,
            "Wind: {} km/h {}",
            current.windspeed_kmph, current.winddir_16_point
        );
        let _ = writeln!(out, "Pressure: {} hPa", current.pressure);
        let _ = writeln!(out, "Visibility: {} km", current.visibility);
        let _ = writeln!(out, "Cloud cover: {}%", current.cloudcover);
        let _ = writeln!(out, "UV index: {}", current.uv_index);
    }

    let days = clamp_days(days, report.weather.len());
    if days > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Forecast:");
        for day in report.weather.iter().take(days) {
            let _ = write!(
                out,
                "{}: High {}°C ({}°F) / Low {}°C ({}°F)",
                day.date, day.max_temp_c, day.max_temp_f, day.min_temp_c, day.min_temp_f
            );
            match day.midday() {
                Some(sample) => {
                    let _ = writeln!(
                        out,
                        ", {}, {}% chance of rain, UV index {}",
                        first_text(&sample.weather_desc),
                        sample.chance_of_rain,
                        sample.uv_index
                    );
                }
                None => {
                    let _ = writeln!(out);
                }
            }
        }
    }

    out.trim_end().to_string()
}
