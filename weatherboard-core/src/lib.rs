//! Core library for the `weatherboard` e-paper weather display.
//!
//! This crate defines:
//! - Configuration loading (TOML file plus environment overrides)
//! - Weather sources: the OpenWeather One Call API or a captured fixture
//! - Extraction of a flat `WeatherRecord` from the raw response
//! - The CSV history log
//! - Layout and composition of the panel image
//! - Output to the e-paper driver or to a preview file
//!
//! It is used by `weatherboard-cli`, which runs the pipeline once per invocation.

pub mod compose;
pub mod config;
pub mod extract;
pub mod history;
pub mod layout;
pub mod logging;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod source;

pub use config::Config;
pub use model::{RawWeatherResponse, UnitSystem, WeatherRecord};
pub use pipeline::{Pipeline, PipelineError};
pub use source::WeatherSource;
