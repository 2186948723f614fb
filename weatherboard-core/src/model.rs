use serde::{Deserialize, Serialize};

/// Raw One Call response as returned by the source, uninterpreted.
pub type RawWeatherResponse = serde_json::Value;

/// Unit system requested from the provider and used for every label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "imperial",
            UnitSystem::Metric => "metric",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "°F",
            UnitSystem::Metric => "°C",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "MPH",
            UnitSystem::Metric => "M/S",
        }
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "imperial" => Ok(UnitSystem::Imperial),
            "metric" => Ok(UnitSystem::Metric),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: imperial, metric."
            )),
        }
    }
}

/// Flat snapshot of the conditions shown on the panel.
///
/// Only the extractor builds one, and only when every field is present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRecord {
    pub temperature_current: f64,
    pub feels_like: f64,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub humidity_percent: f64,
    pub wind_speed: f64,
    pub condition_description: String,
    pub condition_icon_code: String,
    pub precipitation_probability_percent: f64,
    pub alert_count: usize,
    pub alert_summary: String,
}

impl WeatherRecord {
    /// Text for the alert banner, or `None` when there are no alerts.
    pub fn alert_banner(&self) -> Option<String> {
        match self.alert_count {
            0 => None,
            1 => Some(self.alert_summary.clone()),
            n => Some(format!("({n}) {}", self.alert_summary)),
        }
    }
}
