use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const SPORT_RUN: &str = "Run";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
  Tempo,
  Hills,
  Easy,
  Bonus,
  LongRun,
  Race,
}

impl std::fmt::Display for SessionKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Tempo => write!(f, "tempo"),
      Self::Hills => write!(f, "hills"),
      Self::Easy => write!(f, "easy"),
      Self::Bonus => write!(f, "bonus"),
      Self::LongRun => write!(f, "long_run"),
      Self::Race => write!(f, "race"),
    }
  }
}

/// One generated workout, ready to be upserted into the calendar.
///
/// `fuel_rate` and `total_carbs_g` are carried as fields so nothing has to be
/// parsed back out of `description`, which exists for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEvent {
  pub start_date_local: NaiveDateTime,
  pub name: String,
  pub description: String,
  /// Stable per slot so repeated uploads overwrite instead of duplicating
  pub external_id: String,
  pub sport: String,
  pub kind: SessionKind,
  /// 1-based plan week
  pub week: u32,
  /// Grams of carbohydrate per 10 minutes
  pub fuel_rate: f64,
  /// Main-set distance for distance-based sessions
  pub distance_km: Option<f64>,
  pub estimated_minutes: f64,
  pub total_carbs_g: u32,
}

impl WorkoutEvent {
  pub fn is_race(&self) -> bool {
    self.kind == SessionKind::Race
  }
}
