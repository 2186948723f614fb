use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use std::{fmt, fs, path::PathBuf};

use crate::model::{RawWeatherResponse, UnitSystem};

use super::{SourceError, WeatherSource};

const ONE_CALL_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";

/// One Call 3.0 client for a single fixed location.
#[derive(Clone)]
pub struct OpenWeatherSource {
    api_key: String,
    latitude: f64,
    longitude: f64,
    units: UnitSystem,
    record_to: Option<PathBuf>,
    http: Client,
}

impl OpenWeatherSource {
    pub fn new(api_key: String, latitude: f64, longitude: f64, units: UnitSystem) -> Self {
        Self {
            api_key,
            latitude,
            longitude,
            units,
            record_to: None,
            http: Client::new(),
        }
    }

    /// Also save every successful response to `path` for later replay.
    pub fn recording_to(mut self, path: PathBuf) -> Self {
        self.record_to = Some(path);
        self
    }

    fn query(&self) -> [(&'static str, String); 4] {
        [
            ("lat", self.latitude.to_string()),
            ("lon", self.longitude.to_string()),
            ("units", self.units.as_str().to_string()),
            ("appid", self.api_key.clone()),
        ]
    }

    fn record(&self, data: &RawWeatherResponse) {
        let Some(path) = &self.record_to else {
            return;
        };

        let written = serde_json::to_string_pretty(data)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));

        match written {
            Ok(()) => info!("Weather data written to debug JSON file."),
            Err(e) => warn!("Failed to write debug data to {}: {e}", path.display()),
        }
    }
}

// The credential stays out of logs and error chains.
impl fmt::Debug for OpenWeatherSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherSource")
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("units", &self.units)
            .field("record_to", &self.record_to)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn fetch(&self) -> Result<RawWeatherResponse, SourceError> {
        let res = self
            .http
            .get(ONE_CALL_URL)
            .query(&self.query())
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.without_url()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.without_url()))?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let data: RawWeatherResponse = serde_json::from_str(&body).map_err(SourceError::Body)?;
        info!("Weather data fetched successfully.");

        self.record(&data);
        Ok(data)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
