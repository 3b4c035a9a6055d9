use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::RaceConfig;

/// Workout families tracked by the history analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  Long,
  Interval,
  Easy,
  Other,
}

impl Category {
  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Long => "long",
      Category::Interval => "interval",
      Category::Easy => "easy",
      Category::Other => "other",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlucoseUnit {
  MmolPerL,
  MgPerDl,
}

/// One plot sample: minutes since the activity started, glucose in mmol/L
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucosePoint {
  pub minutes: f64,
  pub mmol: f64,
}

/// Analysis of the most recent activity in one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAnalysis {
  pub activity_id: String,
  pub activity_name: String,
  pub started_at: NaiveDateTime,
  /// mmol/L per hour, signed
  pub trend: f64,
  pub current_fuel: f64,
  pub suggested_fuel: f64,
  /// Unit the raw stream was recorded in; `None` when no glucose stream was found
  pub unit: Option<GlucoseUnit>,
  pub points: Vec<GlucosePoint>,
}

impl CategoryAnalysis {
  pub fn fuel_delta(&self) -> f64 {
    self.suggested_fuel - self.current_fuel
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisStatus {
  Complete,
  NoActivities,
  Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
  #[serde(flatten)]
  pub status: AnalysisStatus,
  pub long: Option<CategoryAnalysis>,
  pub interval: Option<CategoryAnalysis>,
  pub easy: Option<CategoryAnalysis>,
}

impl AnalysisResult {
  pub fn empty(status: AnalysisStatus) -> Self {
    Self {
      status,
      long: None,
      interval: None,
      easy: None,
    }
  }

  pub fn get(&self, category: Category) -> Option<&CategoryAnalysis> {
    match category {
      Category::Long => self.long.as_ref(),
      Category::Interval => self.interval.as_ref(),
      Category::Easy => self.easy.as_ref(),
      Category::Other => None,
    }
  }

  pub fn slot_mut(&mut self, category: Category) -> Option<&mut Option<CategoryAnalysis>> {
    match category {
      Category::Long => Some(&mut self.long),
      Category::Interval => Some(&mut self.interval),
      Category::Easy => Some(&mut self.easy),
      Category::Other => None,
    }
  }

  /// True when at least one category produced a suggestion
  pub fn has_suggestions(&self) -> bool {
    self.long.is_some() || self.interval.is_some() || self.easy.is_some()
  }

  /// Feed suggested rates back into a race configuration. Categories without
  /// data keep their current rate.
  pub fn apply_to(&self, config: &RaceConfig) -> RaceConfig {
    let mut updated = config.clone();

    if let Some(long) = &self.long {
      updated.fuel_long = long.suggested_fuel;
    }
    if let Some(interval) = &self.interval {
      updated.fuel_interval = interval.suggested_fuel;
    }
    if let Some(easy) = &self.easy {
      updated.fuel_easy = Some(easy.suggested_fuel);
    }

    updated
  }
}
