//! Plan preview and upload

use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

use super::{CommandError, OutputFormat};
use crate::config::RaceConfig;
use crate::intervals::IntervalsClient;
use crate::models::WorkoutEvent;
use crate::plan::{generate_plan, PlanSummary};

/// Render the remaining plan for `today` as a text preview or JSON
pub fn generate(config_path: &Path, today: NaiveDate, format: OutputFormat) -> Result<String, CommandError> {
  let config = RaceConfig::load(config_path)?;
  let events = generate_plan(&config, today)?;

  match format {
    OutputFormat::Json => Ok(serde_json::to_string_pretty(&events)?),
    OutputFormat::Text => Ok(render_preview(&events)),
  }
}

fn render_preview(events: &[WorkoutEvent]) -> String {
  if events.is_empty() {
    return "No remaining workouts".to_string();
  }

  let mut lines: Vec<String> = events
    .iter()
    .map(|e| {
      format!(
        "{}  {:<40} {:>4.0} min {:>4}g",
        e.start_date_local.format("%a %Y-%m-%d %H:%M"),
        e.name,
        e.estimated_minutes,
        e.total_carbs_g
      )
    })
    .collect();

  let summary = PlanSummary::from_events(events);
  lines.push(String::new());
  lines.push(format!(
    "{} workouts over {} weeks, {}g carbohydrate",
    summary.total_sessions,
    summary.weeks.len(),
    summary.total_carbs_g
  ));

  lines.join("\n")
}

/// Generate the plan and replace the athlete's future workouts with it
pub async fn upload(client: &IntervalsClient, config_path: &Path, today: NaiveDate) -> Result<usize, CommandError> {
  let config = RaceConfig::load(config_path)?;
  let events = generate_plan(&config, today)?;
  info!(prefix = %config.prefix, events = events.len(), "Uploading plan");

  Ok(client.upload_plan(&events, today).await?)
}
