use async_trait::async_trait;
use log::{error, info};
use std::{fs, path::PathBuf};

use crate::model::RawWeatherResponse;

use super::{SourceError, WeatherSource};

/// Replays a response previously saved by a live run.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    path: PathBuf,
}

impl FixtureSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Result<RawWeatherResponse, SourceError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| SourceError::FixtureRead {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| SourceError::FixtureParse {
            path: self.path.clone(),
            source,
        })
    }
}

#[async_trait]
impl WeatherSource for FixtureSource {
    async fn fetch(&self) -> Result<RawWeatherResponse, SourceError> {
        info!("Reading weather data from debug JSON file.");
        self.read().inspect_err(|e| error!("{e}"))
    }
}
