//! One run: fetch, extract, record, compose, present.

use chrono::NaiveDateTime;
use log::info;
use thiserror::Error;

use crate::{
    Config,
    compose::{Composer, CompositionError, Typeface},
    extract::{ExtractionError, extract},
    history::HistorySink,
    output::{OutputError, OutputSink},
    source::{SourceError, WeatherSource, source_from_config},
};

/// Any failure that ends a run early. History failures never get here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to fetch weather data")]
    Source(#[from] SourceError),

    #[error("Error processing weather data")]
    Extraction(#[from] ExtractionError),

    #[error("Error generating display image")]
    Composition(#[from] CompositionError),

    #[error("Failed to present image")]
    Output(#[from] OutputError),
}

#[derive(Debug)]
pub struct Pipeline<T = crate::compose::TrueTypeFace> {
    source: Box<dyn WeatherSource>,
    history: HistorySink,
    composer: Composer<T>,
    output: OutputSink,
}

impl Pipeline {
    /// Resolves every variant from configuration before anything is fetched.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let composer = Composer::from_config(config)?;
        let layout = composer.layout();
        let output = OutputSink::from_config(config, layout.width, layout.height)?;

        Ok(Self {
            source: source_from_config(config)?,
            history: HistorySink::from_config(config),
            composer,
            output,
        })
    }
}

impl<T: Typeface> Pipeline<T> {
    pub fn new(
        source: Box<dyn WeatherSource>,
        history: HistorySink,
        composer: Composer<T>,
        output: OutputSink,
    ) -> Self {
        Self {
            source,
            history,
            composer,
            output,
        }
    }

    /// Runs every stage exactly once, stopping at the first fatal error.
    pub async fn run(&mut self, now: NaiveDateTime) -> Result<(), PipelineError> {
        let raw = self.source.fetch().await?;

        let record = extract(&raw)?;
        info!("Weather data processed successfully.");

        self.history.record(&record, now);

        let image = self.composer.compose(&record, now)?;
        self.output.present(&image)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compose::Assets,
        history::HistoryLog,
        layout::TextSlot,
        model::{RawWeatherResponse, UnitSystem},
        source::fixture::FixtureSource,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use image::{Rgba, RgbaImage};
    use std::{fs, path::Path};

    struct NoText;

    impl Typeface for NoText {
        fn draw(&self, _: &mut RgbaImage, _: &TextSlot, _: &str) {}
    }

    #[derive(Debug)]
    struct Canned(RawWeatherResponse);

    #[async_trait]
    impl WeatherSource for Canned {
        async fn fetch(&self) -> Result<RawWeatherResponse, SourceError> {
            Ok(self.0.clone())
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 22)
            .unwrap()
            .and_hms_opt(6, 45, 0)
            .unwrap()
    }

    fn pipeline(
        root: &Path,
        source: Box<dyn WeatherSource>,
        history: HistorySink,
    ) -> Pipeline<NoText> {
        let assets = Assets::under(root);
        fs::create_dir_all(&assets.icon_dir).unwrap();
        RgbaImage::from_pixel(800, 480, Rgba([255, 255, 255, 255]))
            .save(&assets.template)
            .unwrap();

        let composer = Composer::new(assets, NoText, UnitSystem::Imperial, vec![]);
        let output = OutputSink::File {
            path: root.join("test.png"),
            width: 800,
            height: 480,
        };
        Pipeline::new(source, history, composer, output)
    }

    fn csv_log(root: &Path) -> HistorySink {
        HistorySink::Csv(HistoryLog::new(
            root.join("record.csv"),
            "Denver".into(),
            UnitSystem::Imperial,
        ))
    }

    #[tokio::test]
    async fn fixture_run_writes_history_and_preview() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("weather_debug.json");
        fs::write(&fixture, include_str!("../fixtures/onecall.json")).unwrap();

        let mut pipeline = pipeline(
            dir.path(),
            Box::new(FixtureSource::new(fixture)),
            csv_log(dir.path()),
        );
        pipeline.run(now()).await.expect("run must succeed");
        pipeline.run(now()).await.expect("second run must succeed");

        let history = fs::read_to_string(dir.path().join("record.csv")).unwrap();
        assert_eq!(history.lines().count(), 3);
        assert!(dir.path().join("test.png").exists());
    }

    #[tokio::test]
    async fn extraction_failure_stops_before_history_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let raw = serde_json::json!({ "current": { "temp": 70.0 } });

        let mut pipeline = pipeline(dir.path(), Box::new(Canned(raw)), csv_log(dir.path()));
        let err = pipeline.run(now()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Extraction(ExtractionError::Missing { .. })));
        assert!(!dir.path().join("record.csv").exists());
        assert!(!dir.path().join("test.png").exists());
    }

    #[tokio::test]
    async fn source_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = FixtureSource::new(dir.path().join("absent.json"));

        let mut pipeline = pipeline(dir.path(), Box::new(source), HistorySink::Disabled);
        let err = pipeline.run(now()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Source(_)));
    }

    #[tokio::test]
    async fn history_failure_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let raw: RawWeatherResponse =
            serde_json::from_str(include_str!("../fixtures/onecall.json")).unwrap();
        let broken = HistorySink::Csv(HistoryLog::new(
            dir.path().join("missing").join("record.csv"),
            String::new(),
            UnitSystem::Imperial,
        ));

        let mut pipeline = pipeline(dir.path(), Box::new(Canned(raw)), broken);
        pipeline.run(now()).await.expect("history errors are not fatal");

        assert!(dir.path().join("test.png").exists());
    }

    #[tokio::test]
    async fn composition_failure_happens_after_history() {
        let dir = tempfile::tempdir().unwrap();
        let raw: RawWeatherResponse =
            serde_json::from_str(include_str!("../fixtures/onecall.json")).unwrap();

        let mut pipeline = pipeline(dir.path(), Box::new(Canned(raw)), csv_log(dir.path()));
        fs::remove_file(dir.path().join("pic").join("template.png")).unwrap();

        let err = pipeline.run(now()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Composition(_)));
        assert!(dir.path().join("record.csv").exists());
        assert!(!dir.path().join("test.png").exists());
    }

    #[test]
    fn missing_font_fails_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.display.assets_dir = dir.path().to_path_buf();
        cfg.fixture.read = true;

        let err = Pipeline::from_config(&cfg).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Composition(CompositionError::FontRead { .. })
        ));
    }
}
