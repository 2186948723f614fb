use anyhow::{Context, Result, anyhow};
use chrono::Weekday;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::model::UnitSystem;

/// Where the forecast is taken for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Human-readable name, written to the history log.
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Captured-response replay, used when testing without network access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Read the response from `path` instead of calling the API.
    pub read: bool,
    /// Save every live response to `path`.
    pub write: bool,
    pub path: PathBuf,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            read: false,
            write: false,
            path: PathBuf::from("weather_debug.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("record.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Push the image to the e-paper panel; otherwise write a preview file.
    pub update_display: bool,
    /// Root of `pic/template.png`, `pic/icon/` and `font/Font.ttc`.
    pub assets_dir: PathBuf,
    pub preview_path: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            update_display: false,
            assets_dir: PathBuf::from("assets"),
            preview_path: PathBuf::from("test.jpg"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("weather_display.log"),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "imperial"
/// trash_days = [1, 4]
///
/// [location]
/// name = "Denver"
/// latitude = 39.7392
/// longitude = -104.9903
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeather One Call credential.
    pub api_key: Option<String>,
    pub units: UnitSystem,
    /// Weekdays (0 = Monday .. 6 = Sunday) on which the trash reminder shows.
    pub trash_days: Vec<u8>,
    pub location: LocationConfig,
    pub fixture: FixtureConfig,
    pub history: HistoryConfig,
    pub display: DisplayConfig,
    pub log: LogConfig,
}

impl Config {
    /// Load config from `path` (or the platform default), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_file_path()?,
        };

        let mut cfg = Self::load_file(&path)?;
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherboard", "weatherboard")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply environment-style key/value overrides on top of the file values.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("UPDATE_DISPLAY") {
            self.display.update_display = parse_flag("UPDATE_DISPLAY", &v)?;
        }
        if let Some(v) = get("OPENWEATHER_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = get("LOCATION") {
            self.location.name = v;
        }
        if let Some(v) = get("LATITUDE") {
            self.location.latitude = Some(parse_coordinate("LATITUDE", &v)?);
        }
        if let Some(v) = get("LONGITUDE") {
            self.location.longitude = Some(parse_coordinate("LONGITUDE", &v)?);
        }
        if let Some(v) = get("UNITS") {
            self.units = UnitSystem::try_from(v.as_str())?;
        }
        if let Some(v) = get("CSV_RECORD_HISTORY") {
            self.history.enabled = parse_flag("CSV_RECORD_HISTORY", &v)?;
        }
        if let Some(v) = get("CSV_RECORD_FILE") {
            self.history.path = PathBuf::from(v);
        }
        if let Some(v) = get("LOG_FILE_LOCATION") {
            self.log.file = PathBuf::from(v);
        }
        if let Some(v) = lookup("TRASH_DAYS") {
            self.trash_days = parse_trash_days(&v);
        }
        if let Some(v) = get("WEATHER_READ_DEBUG_JSON") {
            self.fixture.read = parse_flag("WEATHER_READ_DEBUG_JSON", &v)?;
        }
        if let Some(v) = get("WEATHER_WRITE_DEBUG_JSON") {
            self.fixture.write = parse_flag("WEATHER_WRITE_DEBUG_JSON", &v)?;
        }
        if let Some(v) = get("WEATHER_DEBUG_JSON_FILE") {
            self.fixture.path = PathBuf::from(v);
        }
        if let Some(v) = get("WEATHERBOARD_ASSETS_DIR") {
            self.display.assets_dir = PathBuf::from(v);
        }
        if let Some(v) = get("WEATHERBOARD_PREVIEW_FILE") {
            self.display.preview_path = PathBuf::from(v);
        }

        Ok(())
    }

    /// Returns the credential and coordinates needed for a live request.
    pub fn live_request(&self) -> Option<(&str, f64, f64)> {
        let api_key = self.api_key.as_deref().filter(|k| !k.is_empty())?;
        Some((api_key, self.location.latitude?, self.location.longitude?))
    }
}

/// Whether `day` is in a list of weekday numbers counted from Monday = 0.
pub fn weekday_in(days: &[u8], day: Weekday) -> bool {
    days.iter()
        .any(|&d| u32::from(d) == day.num_days_from_monday())
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("Invalid value '{value}' for {key}: expected true or false")),
    }
}

fn parse_coordinate(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid value '{value}' for {key}: expected a number"))
}

/// Parses `"1, 4"` into `[1, 4]`; entries that are not weekday numbers are skipped.
pub fn parse_trash_days(value: &str) -> Vec<u8> {
    value
        .split(',')
        .map(str::trim)
        .filter(|day| !day.is_empty() && day.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|day| day.parse::<u8>().ok())
        .filter(|&day| day <= 6)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_stock_install() {
        let cfg = Config::default();

        assert_eq!(cfg.units, UnitSystem::Imperial);
        assert!(cfg.history.enabled);
        assert_eq!(cfg.history.path, PathBuf::from("record.csv"));
        assert_eq!(cfg.fixture.path, PathBuf::from("weather_debug.json"));
        assert_eq!(cfg.display.preview_path, PathBuf::from("test.jpg"));
        assert_eq!(cfg.log.file, PathBuf::from("weather_display.log"));
        assert!(!cfg.display.update_display);
        assert!(cfg.trash_days.is_empty());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.apply_overrides(env(&[
            ("UPDATE_DISPLAY", "True"),
            ("OPENWEATHER_API_KEY", "KEY"),
            ("LOCATION", "Denver"),
            ("LATITUDE", "39.74"),
            ("LONGITUDE", "-104.99"),
            ("UNITS", "metric"),
            ("CSV_RECORD_HISTORY", "False"),
            ("CSV_RECORD_FILE", "/tmp/history.csv"),
            ("TRASH_DAYS", "2,5"),
            ("WEATHER_READ_DEBUG_JSON", "True"),
        ]))
        .expect("overrides must apply");

        assert!(cfg.display.update_display);
        assert_eq!(cfg.live_request(), Some(("KEY", 39.74, -104.99)));
        assert_eq!(cfg.location.name, "Denver");
        assert_eq!(cfg.units, UnitSystem::Metric);
        assert!(!cfg.history.enabled);
        assert_eq!(cfg.history.path, PathBuf::from("/tmp/history.csv"));
        assert_eq!(cfg.trash_days, vec![2, 5]);
        assert!(cfg.fixture.read);
        assert!(!cfg.fixture.write);
    }

    #[test]
    fn invalid_override_is_an_error() {
        let mut cfg = Config::default();
        let err = cfg.apply_overrides(env(&[("LATITUDE", "north")])).unwrap_err();
        assert!(err.to_string().contains("LATITUDE"));

        let err = cfg.apply_overrides(env(&[("UPDATE_DISPLAY", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("UPDATE_DISPLAY"));
    }

    #[test]
    fn trash_days_skip_garbage_entries() {
        assert_eq!(parse_trash_days("0, 3,x,,9, 6"), vec![0, 3, 6]);
        assert!(parse_trash_days("").is_empty());
    }

    #[test]
    fn trash_days_must_be_bare_digits() {
        assert_eq!(parse_trash_days("+1, -2, 3"), vec![3]);
        assert_eq!(parse_trash_days(" 04 ,1.0"), vec![4]);
    }

    #[test]
    fn trash_day_uses_monday_as_zero() {
        let days = [0, 6];

        assert!(weekday_in(&days, Weekday::Mon));
        assert!(weekday_in(&days, Weekday::Sun));
        assert!(!weekday_in(&days, Weekday::Wed));
    }

    #[test]
    fn live_request_requires_key_and_coordinates() {
        let mut cfg = Config::default();
        assert!(cfg.live_request().is_none());

        cfg.api_key = Some("KEY".into());
        cfg.location.latitude = Some(1.0);
        assert!(cfg.live_request().is_none());

        cfg.location.longitude = Some(2.0);
        assert_eq!(cfg.live_request(), Some(("KEY", 1.0, 2.0)));
    }

    #[test]
    fn save_and_load_roundtrip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.api_key = Some("KEY".into());
        cfg.trash_days = vec![1];
        cfg.location.name = "Home".into();
        cfg.save(&path).expect("save must succeed");

        let loaded = Config::load_file(&path).expect("load must succeed");
        assert_eq!(loaded.api_key.as_deref(), Some("KEY"));
        assert_eq!(loaded.trash_days, vec![1]);
        assert_eq!(loaded.location.name, "Home");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_file(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.api_key.is_none());
    }
}
