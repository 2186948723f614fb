use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{Confirm, CustomType, Password, Select, Text};
use log::info;
use std::path::{Path, PathBuf};

use weatherboard_core::{
    Config, Pipeline, UnitSystem,
    config::{LogConfig, parse_trash_days},
    logging,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherboard", version, about = "E-paper weather display")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputMode {
    /// Write a preview image file.
    File,
    /// Refresh the e-paper panel.
    Device,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the weather once and update the display.
    Run {
        /// Override where the image goes (UPDATE_DISPLAY otherwise).
        #[arg(long, value_enum)]
        output: Option<OutputMode>,

        /// Replay the saved debug JSON instead of calling the API.
        #[arg(long)]
        fixture: bool,
    },

    /// Interactively write the config file.
    Configure,

    /// Print where the config file is read from.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Run { output, fixture } => run_once(&path, output, fixture).await,
            Command::Configure => configure(&path),
            Command::ConfigPath => {
                println!("{}", path.display());
                Ok(())
            }
        }
    }
}

async fn run_once(path: &Path, output: Option<OutputMode>, fixture: bool) -> anyhow::Result<()> {
    let mut config = match Config::load(Some(path)) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&LogConfig::default());
            return Err(e);
        }
    };

    if let Some(mode) = output {
        config.display.update_display = matches!(mode, OutputMode::Device);
    }
    if fixture {
        config.fixture.read = true;
    }

    logging::init(&config.log);
    info!("Weather display script started.");

    let now = Local::now().naive_local();
    let mut pipeline = Pipeline::from_config(&config)?;
    pipeline.run(now).await?;

    Ok(())
}

fn configure(path: &Path) -> anyhow::Result<()> {
    let mut config = Config::load_file(path)?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()?;
    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_string());
    }

    config.location.name = Text::new("Location name:")
        .with_default(&config.location.name)
        .prompt()?;

    config.location.latitude = Some(coordinate("Latitude:", config.location.latitude)?);
    config.location.longitude = Some(coordinate("Longitude:", config.location.longitude)?);

    let units = [UnitSystem::Imperial, UnitSystem::Metric];
    let cursor = units.iter().position(|u| *u == config.units).unwrap_or(0);
    config.units = Select::new("Units:", units.to_vec())
        .with_starting_cursor(cursor)
        .prompt()?;

    let current_days = config
        .trash_days
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let days = Text::new("Trash collection days (0 = Monday .. 6 = Sunday, comma separated):")
        .with_default(&current_days)
        .prompt()?;
    config.trash_days = parse_trash_days(&days);

    config.history.enabled = Confirm::new("Record history to CSV?")
        .with_default(config.history.enabled)
        .prompt()?;

    config.display.update_display = Confirm::new("Refresh the e-paper panel on each run?")
        .with_default(config.display.update_display)
        .prompt()?;

    config
        .save(path)
        .with_context(|| format!("Could not save configuration to {}", path.display()))?;

    println!("Configuration saved to {}", path.display());
    Ok(())
}

fn coordinate(message: &str, current: Option<f64>) -> anyhow::Result<f64> {
    let prompt = CustomType::<f64>::new(message).with_error_message("Please enter a number");
    let prompt = match current {
        Some(value) => prompt.with_default(value),
        None => prompt,
    };
    Ok(prompt.prompt()?)
}
