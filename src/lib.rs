pub mod commands;
pub mod config;
pub mod history;
pub mod intervals;
pub mod logging;
pub mod models;
pub mod plan;
pub mod trend;
pub mod zones;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use std::process::ExitCode;
use tracing::error;

pub use config::{IntervalsConfig, RaceConfig};
pub use history::{analyze_history, classify_name, AnalyzerOptions};
pub use intervals::{ActivitySource, IntervalsClient};
pub use models::{AnalysisResult, Category, WorkoutEvent};
pub use plan::{generate_plan, PlanSummary};

pub fn run() -> ExitCode {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let cli = commands::Cli::parse();

  if let Err(e) = logging::LoggingConfig::from_env().init() {
    eprintln!("Failed to initialize logging: {}", e);
  }

  let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
    Ok(runtime) => runtime,
    Err(e) => {
      error!(error = %e, "Failed to start async runtime");
      return ExitCode::FAILURE;
    }
  };

  match runtime.block_on(commands::run(cli)) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      error!(error = %e, "Command failed");
      eprintln!("Error: {}", e);
      ExitCode::FAILURE
    }
  }
}
