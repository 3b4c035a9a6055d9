//! Command-line entry points
//!
//! Each subcommand returns its output as a value; printing happens in `run`.

pub mod analyze;
pub mod plan;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use crate::config::{ConfigError, IntervalsConfig};
use crate::history::AnalyzerOptions;
use crate::intervals::{IntervalsClient, IntervalsError};
use crate::plan::PlanError;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Plan(#[from] PlanError),

  #[error(transparent)]
  Intervals(#[from] IntervalsError),

  #[error("Failed to render output: {0}")]
  Output(#[from] serde_json::Error),
}

/// ---------------------------------------------------------------------------
/// Arguments
/// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(
  name = "run-fuel",
  version,
  about = "Periodized running plans with glucose-driven fueling for Intervals.icu"
)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Command,

  /// Reference date (YYYY-MM-DD), defaults to the local date
  #[arg(long, global = true)]
  pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  Text,
  Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Print the remaining plan without uploading it
  Generate {
    /// Race configuration file (JSON)
    config: PathBuf,

    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
  },

  /// Replace future planned workouts on Intervals.icu with the generated plan
  Upload {
    /// Race configuration file (JSON)
    config: PathBuf,
  },

  /// Suggest fuel rates from recent glucose data
  Analyze {
    /// Race configuration file (JSON)
    config: PathBuf,

    /// Write suggested rates back into the configuration file
    #[arg(long)]
    apply: bool,

    /// Days of history to consider
    #[arg(long, default_value_t = 45)]
    lookback_days: i64,
  },
}

/// ---------------------------------------------------------------------------
/// Dispatch
/// ---------------------------------------------------------------------------

pub async fn run(cli: Cli) -> Result<(), CommandError> {
  let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
  info!(%today, "Reference date");

  match cli.command {
    Command::Generate { config, format } => {
      println!("{}", plan::generate(&config, today, format)?);
    }
    Command::Upload { config } => {
      let client = IntervalsClient::new(IntervalsConfig::from_env()?);
      let count = plan::upload(&client, &config, today).await?;
      println!("Uploaded {} workouts", count);
    }
    Command::Analyze {
      config,
      apply,
      lookback_days,
    } => {
      let client = IntervalsClient::new(IntervalsConfig::from_env()?);
      let options = AnalyzerOptions {
        lookback_days,
        ..AnalyzerOptions::default()
      };
      let result = analyze::analyze(&client, &config, today, &options, apply).await?;
      println!("{}", serde_json::to_string_pretty(&result)?);
    }
  }

  Ok(())
}
