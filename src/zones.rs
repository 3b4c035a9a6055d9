//! Heart-rate zone model and step formatting
//!
//! Zones are expressed as fractions of lactate-threshold heart rate (LTHR).
//! Every generated workout step is rendered through `format_step`, so the
//! text Intervals.icu displays and the bpm targets always agree.

use serde::{Deserialize, Serialize};

/// Absorbs binary floating-point noise before floor/ceil (0.9 * 100 = 90.00000000000001)
const ROUNDING_TOLERANCE: f64 = 1e-9;

/// ---------------------------------------------------------------------------
/// Zones
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
  Easy,
  Steady,
  Tempo,
  Hard,
}

impl Zone {
  /// Expected running pace in min/km, used to turn distance blocks into minutes
  pub fn pace_min_per_km(&self) -> f64 {
    match self {
      Zone::Hard => 4.75,
      Zone::Tempo => 5.15,
      Zone::Steady => 6.15,
      Zone::Easy => 6.75,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Zone::Easy => "easy",
      Zone::Steady => "steady",
      Zone::Tempo => "tempo",
      Zone::Hard => "hard",
    }
  }
}

/// A [min, max] band as a fraction of LTHR
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBand {
  pub min: f64,
  pub max: f64,
}

impl ZoneBand {
  pub const fn new(min: f64, max: f64) -> Self {
    Self { min, max }
  }

  pub fn bpm(&self, lthr: u32) -> (u32, u32) {
    bpm_range(self.min, self.max, lthr)
  }
}

/// Four-band zone table, overridable per race config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrZoneModel {
  pub easy: ZoneBand,
  pub steady: ZoneBand,
  pub tempo: ZoneBand,
  pub hard: ZoneBand,
}

impl Default for HrZoneModel {
  fn default() -> Self {
    Self {
      easy: ZoneBand::new(0.68, 0.83),
      steady: ZoneBand::new(0.84, 0.89),
      tempo: ZoneBand::new(0.90, 0.99),
      hard: ZoneBand::new(1.00, 1.11),
    }
  }
}

impl HrZoneModel {
  pub fn band(&self, zone: Zone) -> ZoneBand {
    match zone {
      Zone::Easy => self.easy,
      Zone::Steady => self.steady,
      Zone::Tempo => self.tempo,
      Zone::Hard => self.hard,
    }
  }

  /// Every bound must sit in (0, 1.2] with min <= max
  pub fn validate(&self) -> Result<(), String> {
    for zone in [Zone::Easy, Zone::Steady, Zone::Tempo, Zone::Hard] {
      let band = self.band(zone);
      let in_range = |v: f64| v > 0.0 && v <= 1.2;
      if !in_range(band.min) || !in_range(band.max) || band.min > band.max {
        return Err(format!(
          "Invalid {} zone: {}-{} (bounds must be in (0, 1.2] and ordered)",
          zone.as_str(),
          band.min,
          band.max
        ));
      }
    }
    Ok(())
  }

  /// Render one step in the given zone
  pub fn step(&self, duration: &str, zone: Zone, lthr: u32, note: Option<&str>) -> String {
    let band = self.band(zone);
    format_step(duration, band.min, band.max, lthr, note)
  }
}

/// ---------------------------------------------------------------------------
/// Pacing Math
/// ---------------------------------------------------------------------------

fn floor_tolerant(value: f64) -> f64 {
  (value + ROUNDING_TOLERANCE).floor()
}

fn ceil_tolerant(value: f64) -> f64 {
  (value - ROUNDING_TOLERANCE).ceil()
}

/// Convert a percentage band to bpm: floor of the lower bound, ceil of the upper.
/// No clamping; callers supply sane fractions.
pub fn bpm_range(pct_min: f64, pct_max: f64, lthr: u32) -> (u32, u32) {
  let lthr = lthr as f64;
  let min = floor_tolerant(lthr * pct_min).max(0.0);
  let max = ceil_tolerant(lthr * pct_max).max(0.0);
  (min as u32, max as u32)
}

/// `"<note> <duration> <min>-<max>% LTHR (<bpm_min>-<bpm_max> bpm)"`
pub fn format_step(
  duration: &str,
  pct_min: f64,
  pct_max: f64,
  lthr: u32,
  note: Option<&str>,
) -> String {
  let (bpm_min, bpm_max) = bpm_range(pct_min, pct_max, lthr);
  let pct_lo = floor_tolerant(pct_min * 100.0) as i64;
  let pct_hi = ceil_tolerant(pct_max * 100.0) as i64;

  let target = format!(
    "{} {}-{}% LTHR ({}-{} bpm)",
    duration, pct_lo, pct_hi, bpm_min, bpm_max
  );

  match note {
    Some(n) if !n.is_empty() => format!("{} {}", n, target),
    _ => target,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
