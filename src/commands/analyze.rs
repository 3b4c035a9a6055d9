use chrono::NaiveDate;
use std::path::Path;
use tracing::{info, warn};

use super::CommandError;
use crate::config::RaceConfig;
use crate::history::{analyze_history, AnalyzerOptions};
use crate::intervals::ActivitySource;
use crate::models::{AnalysisResult, AnalysisStatus};

/// Run the history analyzer for the plan in `config_path`. With `apply`, the
/// suggested rates are written back into the same file.
pub async fn analyze<S>(
  source: &S,
  config_path: &Path,
  today: NaiveDate,
  options: &AnalyzerOptions,
  apply: bool,
) -> Result<AnalysisResult, CommandError>
where
  S: ActivitySource + ?Sized,
{
  let config = RaceConfig::load(config_path)?;
  let result = analyze_history(source, &config.prefix, today, options).await;

  if let AnalysisStatus::Failed { reason } = &result.status {
    warn!(reason = %reason, "History analysis failed");
  }

  if apply && result.has_suggestions() {
    let updated = result.apply_to(&config);
    if updated != config {
      updated.save(config_path)?;
      info!(
        path = %config_path.display(),
        fuel_interval = updated.fuel_interval,
        fuel_long = updated.fuel_long,
        fuel_easy = ?updated.fuel_easy,
        "Applied suggested fuel rates"
      );
    }
  }

  Ok(result)
}
