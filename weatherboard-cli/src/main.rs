//! Binary crate for the `weatherboard` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Running the display pipeline once and reporting the outcome

use clap::Parser;
use log::{Level, error, log_enabled};
use std::process::ExitCode;

mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cmd = cli::Cli::parse();

    match cmd.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if log_enabled!(Level::Error) {
                error!("An unexpected error occurred: {e:#}");
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
