//! Glucose trend estimation and fuel-rate policy
//!
//! Everything here is pure math on already-fetched samples so the analyzer's
//! network code stays thin and the thresholds can be pinned by tests.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{GlucosePoint, GlucoseUnit};

/// ---------------------------------------------------------------------------
/// Thresholds
/// ---------------------------------------------------------------------------

pub const MGDL_PER_MMOL: f64 = 18.018;
/// A stream whose mean exceeds this is treated as mg/dL
pub const MGDL_MEAN_THRESHOLD: f64 = 15.0;
/// A stream whose peak exceeds this is treated as mg/dL
pub const MGDL_MAX_THRESHOLD: f64 = 20.0;
/// Shorter recordings report a flat trend
pub const MIN_TREND_HOURS: f64 = 0.2;

/// mmol/L per hour below which the athlete is crashing
pub const CRASH_TREND: f64 = -3.0;
/// mmol/L per hour above which the athlete is spiking
pub const SPIKE_TREND: f64 = 3.0;
pub const CRASH_SCALE: f64 = 0.7;
pub const MAX_FUEL_INCREASE: f64 = 4.0;
pub const DEFAULT_FUEL_RATE: f64 = 10.0;

/// ---------------------------------------------------------------------------
/// Unit Normalization
/// ---------------------------------------------------------------------------

/// Guess the unit of a raw glucose stream from its magnitude.
/// mg/dL when `mean > 15` or `max > 20`, otherwise mmol/L.
pub fn detect_glucose_unit(values: &[f64]) -> GlucoseUnit {
  if values.is_empty() {
    return GlucoseUnit::MmolPerL;
  }

  let mean = values.iter().sum::<f64>() / values.len() as f64;
  let max = values.iter().copied().fold(f64::MIN, f64::max);

  if mean > MGDL_MEAN_THRESHOLD || max > MGDL_MAX_THRESHOLD {
    GlucoseUnit::MgPerDl
  } else {
    GlucoseUnit::MmolPerL
  }
}

pub fn to_mmol(value: f64, unit: GlucoseUnit) -> f64 {
  match unit {
    GlucoseUnit::MgPerDl => value / MGDL_PER_MMOL,
    GlucoseUnit::MmolPerL => value,
  }
}

/// Return the values in mmol/L together with the detected source unit
pub fn normalize_glucose(values: &[f64]) -> (Vec<f64>, GlucoseUnit) {
  let unit = detect_glucose_unit(values);
  (values.iter().map(|v| to_mmol(*v, unit)).collect(), unit)
}

/// ---------------------------------------------------------------------------
/// Trend
/// ---------------------------------------------------------------------------

/// Pair a time axis (seconds) with glucose samples (mmol/L). Samples missing
/// either side are dropped; minutes are measured from the first time sample.
pub fn build_points(times: &[Option<f64>], glucose: &[Option<f64>]) -> Vec<GlucosePoint> {
  let origin = times.iter().flatten().next().copied().unwrap_or(0.0);

  times
    .iter()
    .zip(glucose.iter())
    .filter_map(|(t, g)| match (t, g) {
      (Some(t), Some(g)) => Some(GlucosePoint {
        minutes: (t - origin) / 60.0,
        mmol: *g,
      }),
      _ => None,
    })
    .collect()
}

/// Two-point slope in mmol/L per hour between the first and last sample.
/// Returns 0 when the recording spans `MIN_TREND_HOURS` or less.
pub fn glucose_trend(points: &[GlucosePoint]) -> f64 {
  let (first, last) = match (points.first(), points.last()) {
    (Some(f), Some(l)) => (f, l),
    _ => return 0.0,
  };

  let hours = (last.minutes - first.minutes) / 60.0;
  if hours > MIN_TREND_HOURS {
    (last.mmol - first.mmol) / hours
  } else {
    0.0
  }
}

/// ---------------------------------------------------------------------------
/// Fuel Rate
/// ---------------------------------------------------------------------------

/// Current token first, legacy token second
const FUEL_PATTERNS: [&str; 2] = [
  r"(?i)FUEL PER 10:\s*(\d+(?:\.\d+)?)\s*g",
  r"(?i)FUEL:\s*(\d+(?:\.\d+)?)\s*g",
];

fn fuel_patterns() -> &'static [Regex] {
  static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
  PATTERNS.get_or_init(|| FUEL_PATTERNS.iter().filter_map(|p| Regex::new(p).ok()).collect())
}

/// Read the fuel rate a past workout was planned with from its description.
/// Current `FUEL PER 10: <N>g` wins over legacy `FUEL: <N>g`; default 10.
pub fn extract_fuel_rate(description: Option<&str>) -> f64 {
  let Some(text) = description else {
    return DEFAULT_FUEL_RATE;
  };

  fuel_patterns()
    .iter()
    .find_map(|re| {
      re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    })
    .unwrap_or(DEFAULT_FUEL_RATE)
}

/// Adjust a fuel rate from the observed glucose trend.
///
/// Crash (trend < -3): add `min(1 + floor(|trend + 3| * 0.7), 4)` grams.
/// Spike (trend > +3): remove 1 gram, never below 0.
pub fn suggest_fuel(current: f64, trend: f64) -> f64 {
  if trend < CRASH_TREND {
    let increase = (1.0 + ((trend - CRASH_TREND).abs() * CRASH_SCALE).floor()).min(MAX_FUEL_INCREASE);
    current + increase
  } else if trend > SPIKE_TREND {
    (current - 1.0).max(0.0)
  } else {
    current
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
