use async_trait::async_trait;
use std::{fmt::Debug, io, path::PathBuf};
use thiserror::Error;

use crate::{
    Config,
    model::RawWeatherResponse,
    source::{fixture::FixtureSource, openweather::OpenWeatherSource},
};

pub mod fixture;
pub mod openweather;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("Failed to send request to OpenWeather")]
    Transport(#[source] reqwest::Error),

    #[error("OpenWeather request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse OpenWeather JSON")]
    Body(#[source] serde_json::Error),

    #[error("Failed to read debug JSON file {}", path.display())]
    FixtureRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse debug JSON file {}", path.display())]
    FixtureParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that can hand back one raw weather response per call.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch(&self) -> Result<RawWeatherResponse, SourceError>;
}

/// Picks the fixture or the live source once, from configuration.
pub fn source_from_config(config: &Config) -> Result<Box<dyn WeatherSource>, SourceError> {
    if config.fixture.read {
        return Ok(Box::new(FixtureSource::new(config.fixture.path.clone())));
    }

    let (api_key, latitude, longitude) = config.live_request().ok_or_else(|| {
        SourceError::NotConfigured(
            "No API key or coordinates configured for OpenWeather.\n\
             Hint: run `weatherboard configure` or set OPENWEATHER_API_KEY, LATITUDE and LONGITUDE."
                .to_string(),
        )
    })?;

    let mut source = OpenWeatherSource::new(api_key.to_owned(), latitude, longitude, config.units);
    if config.fixture.write {
        source = source.recording_to(config.fixture.path.clone());
    }

    Ok(Box::new(source))
}
