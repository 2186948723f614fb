//! Append-only CSV log of every reading shown on the panel.

use chrono::NaiveDateTime;
use log::{error, info};
use std::{
    fs::OpenOptions,
    io,
    path::PathBuf,
};
use thiserror::Error;

use crate::{
    Config,
    model::{UnitSystem, WeatherRecord},
};

const HEADER: [&str; 11] = [
    "YEAR",
    "MONTH",
    "DATE",
    "TIME",
    "LOCATION",
    "TEMP_CURRENT",
    "HEAT_INDEX",
    "TEMP_MAX",
    "TEMP_MIN",
    "HUMIDITY",
    "DAILY_PRECIP_PROB",
];

#[derive(Debug, Error)]
pub enum HistoryWriteError {
    #[error("Failed to open history file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write history row")]
    Write(#[from] csv::Error),

    #[error("Failed to flush history file")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub enum HistorySink {
    /// Recording is switched off; nothing touches the filesystem.
    Disabled,
    Csv(HistoryLog),
}

impl HistorySink {
    pub fn from_config(config: &Config) -> Self {
        if config.history.enabled {
            HistorySink::Csv(HistoryLog::new(
                config.history.path.clone(),
                config.location.name.clone(),
                config.units,
            ))
        } else {
            HistorySink::Disabled
        }
    }

    /// Appends a row, logging and swallowing any failure.
    pub fn record(&self, record: &WeatherRecord, now: NaiveDateTime) {
        let HistorySink::Csv(log) = self else {
            return;
        };

        match log.append(record, now) {
            Ok(()) => info!("Weather data appended to CSV."),
            Err(e) => error!("Failed to save data to CSV: {e}"),
        }
    }
}

/// Writes whole values with a trailing `.0` so float columns stay floats
/// (`35.0`, not `35`).
fn decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
    location: String,
    units: UnitSystem,
}

impl HistoryLog {
    pub fn new(path: PathBuf, location: String, units: UnitSystem) -> Self {
        Self {
            path,
            location,
            units,
        }
    }

    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
        header.push(format!("WIND_SPEED({})", self.units.speed_suffix()));
        header
    }

    pub fn row(&self, record: &WeatherRecord, now: NaiveDateTime) -> [String; 12] {
        [
            now.format("%Y").to_string(),
            now.format("%m").to_string(),
            now.format("%d").to_string(),
            now.format("%H:%M").to_string(),
            self.location.clone(),
            decimal(record.temperature_current),
            decimal(record.feels_like),
            decimal(record.temperature_max),
            decimal(record.temperature_min),
            record.humidity_percent.to_string(),
            decimal(record.precipitation_probability_percent),
            decimal(record.wind_speed),
        ]
    }

    /// Appends one row, writing the header first when the file is new.
    pub fn append(&self, record: &WeatherRecord, now: NaiveDateTime) -> Result<(), HistoryWriteError> {
        let is_new = !self.path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| HistoryWriteError::Open {
                path: self.path.clone(),
                source,
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            writer.write_record(&self.header())?;
        }
        writer.write_record(self.row(record, now))?;
        writer.flush()?;

        Ok(())
    }
}
