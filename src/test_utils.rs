//! Test utilities shared by the unit test modules
//!
//! - Mock data factories for configs, activities and streams
//! - An in-memory `ActivitySource`
//! - Helper assertions

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::config::RaceConfig;
use crate::intervals::{Activity, ActivitySource, ActivityStream, IntervalsError};
use crate::models::{CategoryAnalysis, GlucosePoint, GlucoseUnit};
use crate::trend::MGDL_PER_MMOL;
use crate::zones::HrZoneModel;

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// 18-week 16 km plan racing on Saturday 2026-06-13, two-rate fueling
pub fn mock_race_config() -> RaceConfig {
  RaceConfig {
    race_name: "Eco Half".to_string(),
    race_date: "2026-06-13".to_string(),
    race_distance_km: 16.0,
    lthr: 169,
    prefix: "eco16".to_string(),
    total_weeks: 18,
    start_km: 8.0,
    fuel_interval: 5.0,
    fuel_long: 10.0,
    fuel_easy: None,
    zones: HrZoneModel::default(),
  }
}

pub fn mock_category_analysis(current_fuel: f64, suggested_fuel: f64) -> CategoryAnalysis {
  CategoryAnalysis {
    activity_id: "i1001".to_string(),
    activity_name: "W03 Sun LR (9km) eco16".to_string(),
    started_at: datetime(2026, 3, 8, 12),
    trend: 0.0,
    current_fuel,
    suggested_fuel,
    unit: Some(GlucoseUnit::MmolPerL),
    points: vec![GlucosePoint {
      minutes: 0.0,
      mmol: 6.0,
    }],
  }
}

pub fn mock_activity(id: &str, name: &str, start: NaiveDateTime, description: Option<&str>) -> Activity {
  Activity {
    id: id.to_string(),
    name: Some(name.to_string()),
    description: description.map(str::to_string),
    start_date_local: start,
    activity_type: Some("Run".to_string()),
    distance: Some(10000.0),
    moving_time: Some(3600),
    average_heartrate: Some(145.0),
    average_cadence: None,
    icu_training_load: None,
    icu_intensity: None,
  }
}

/// A `time` stream sampled every minute plus a linear glucose stream from
/// `start_mmol` to `end_mmol`, optionally recorded in mg/dL
pub fn glucose_streams(
  stream_type: &str,
  start_mmol: f64,
  end_mmol: f64,
  minutes: u32,
  mgdl: bool,
) -> Vec<ActivityStream> {
  let scale = if mgdl { MGDL_PER_MMOL } else { 1.0 };
  let samples = minutes.max(1);

  let time = (0..=samples).map(|i| serde_json::json!(i * 60)).collect();
  let glucose = (0..=samples)
    .map(|i| {
      let frac = i as f64 / samples as f64;
      serde_json::json!((start_mmol + (end_mmol - start_mmol) * frac) * scale)
    })
    .collect();

  vec![
    ActivityStream {
      stream_type: "time".to_string(),
      data: time,
    },
    ActivityStream {
      stream_type: stream_type.to_string(),
      data: glucose,
    },
  ]
}

/// ---------------------------------------------------------------------------
/// Mock Activity Source
/// ---------------------------------------------------------------------------

/// In-memory activity source that records what it was asked for
pub struct MockSource {
  activities: Result<Vec<Activity>, String>,
  streams: HashMap<String, Vec<ActivityStream>>,
  failing_streams: HashSet<String>,
  pub activity_window: Mutex<Option<(NaiveDate, NaiveDate)>>,
  pub stream_calls: Mutex<Vec<String>>,
}

impl MockSource {
  pub fn new(activities: Vec<Activity>) -> Self {
    Self {
      activities: Ok(activities),
      streams: HashMap::new(),
      failing_streams: HashSet::new(),
      activity_window: Mutex::new(None),
      stream_calls: Mutex::new(Vec::new()),
    }
  }

  /// Activity listing fails with a 500 carrying `body`
  pub fn failing(body: &str) -> Self {
    Self {
      activities: Err(body.to_string()),
      ..Self::new(vec![])
    }
  }

  pub fn with_streams(mut self, activity_id: &str, streams: Vec<ActivityStream>) -> Self {
    self.streams.insert(activity_id.to_string(), streams);
    self
  }

  pub fn with_failing_streams(mut self, activity_id: &str) -> Self {
    self.failing_streams.insert(activity_id.to_string());
    self
  }
}

#[async_trait]
impl ActivitySource for MockSource {
  async fn fetch_activities(
    &self,
    oldest: NaiveDate,
    newest: NaiveDate,
  ) -> Result<Vec<Activity>, IntervalsError> {
    *self.activity_window.lock().unwrap() = Some((oldest, newest));
    self.activities.clone().map_err(|body| IntervalsError::Api { status: 500, body })
  }

  async fn fetch_streams(&self, activity_id: &str) -> Result<Vec<ActivityStream>, IntervalsError> {
    self.stream_calls.lock().unwrap().push(activity_id.to_string());

    if self.failing_streams.contains(activity_id) {
      return Err(IntervalsError::Api {
        status: 502,
        body: "Bad Gateway".to_string(),
      });
    }
    Ok(self.streams.get(activity_id).cloned().unwrap_or_default())
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn datetime(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
  date(year, month, day).and_hms_opt(hour, 0, 0).unwrap()
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mock_factories_create_valid_data() {
    let config = mock_race_config();
    assert!(config.validate().is_ok());
    assert_eq!(config.parse_race_date().unwrap(), date(2026, 6, 13));

    let activity = mock_activity("i1", "W01 Tue Tempo eco16", datetime(2026, 2, 10, 12), None);
    assert_eq!(activity.display_name(), "W01 Tue Tempo eco16");
  }

  #[test]
  fn test_glucose_streams_shape() {
    let streams = glucose_streams("bloodglucose", 6.0, 3.0, 60, false);
    assert_eq!(streams[0].values().len(), 61);
    assert_eq!(streams[0].values()[60], Some(3600.0));
    assert_eq!(streams[1].values()[0], Some(6.0));
    assert_eq!(streams[1].values()[60], Some(3.0));
  }
}
