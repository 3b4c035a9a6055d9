use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::zones::HrZoneModel;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_BASE_URL: &str = "https://intervals.icu";
const DEFAULT_ATHLETE_ID: &str = "0";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  MissingEnv(String),

  #[error("Failed to read config file {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse config file {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_json::Error,
  },
}

/// ---------------------------------------------------------------------------
/// Race Configuration
/// ---------------------------------------------------------------------------

/// Everything the plan generator needs. Fuel rates are grams of carbohydrate
/// per 10 minutes of running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
  pub race_name: String,
  /// `YYYY-MM-DD`, parsed when the plan is generated
  pub race_date: String,
  pub race_distance_km: f64,
  pub lthr: u32,
  pub prefix: String,
  pub total_weeks: u32,
  pub start_km: f64,
  pub fuel_interval: f64,
  pub fuel_long: f64,
  /// Two-rate configurations leave this out and run easy days on the long rate
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fuel_easy: Option<f64>,
  #[serde(default)]
  pub zones: HrZoneModel,
}

impl RaceConfig {
  /// Load a race configuration from a JSON file
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.display().to_string(),
      source,
    })?;

    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
      path: path.display().to_string(),
      source,
    })
  }

  /// Write the configuration back as pretty JSON
  pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
      path: path.display().to_string(),
      source,
    })?;

    fs::write(path, json + "\n").map_err(|source| ConfigError::Io {
      path: path.display().to_string(),
      source,
    })
  }

  /// Easy-day fuel rate, falling back to the long-run rate
  pub fn effective_fuel_easy(&self) -> f64 {
    self.fuel_easy.unwrap_or(self.fuel_long)
  }

  pub fn parse_race_date(&self) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(self.race_date.trim(), "%Y-%m-%d")
  }

  /// Check numeric invariants; the race date is checked separately so its
  /// parse error can reach the caller untouched
  pub fn validate(&self) -> Result<(), String> {
    if self.total_weeks < 1 {
      return Err("total_weeks must be at least 1".into());
    }
    if self.lthr == 0 {
      return Err("lthr must be positive".into());
    }
    if !(self.race_distance_km > 0.0) {
      return Err(format!("race_distance_km must be positive, got {}", self.race_distance_km));
    }
    if !(self.start_km >= 0.0) {
      return Err(format!("start_km must be non-negative, got {}", self.start_km));
    }
    if self.prefix.trim().is_empty() {
      return Err("prefix must not be empty".into());
    }

    let rates = [
      ("fuel_interval", Some(self.fuel_interval)),
      ("fuel_long", Some(self.fuel_long)),
      ("fuel_easy", self.fuel_easy),
    ];
    for (name, rate) in rates {
      if let Some(r) = rate {
        if !(r >= 0.0) {
          return Err(format!("{} must be non-negative, got {}", name, r));
        }
      }
    }

    self.zones.validate()
  }
}

/// ---------------------------------------------------------------------------
/// Intervals.icu Credentials
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct IntervalsConfig {
  pub api_key: String,
  pub athlete_id: String,
  pub base_url: String,
}

impl IntervalsConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let api_key = env::var("INTERVALS_API_KEY")
      .ok()
      .filter(|k| !k.trim().is_empty())
      .ok_or_else(|| ConfigError::MissingEnv("INTERVALS_API_KEY".into()))?;

    Ok(Self {
      api_key,
      athlete_id: env::var("INTERVALS_ATHLETE_ID").unwrap_or_else(|_| DEFAULT_ATHLETE_ID.into()),
      base_url: env::var("INTERVALS_BASE_URL")
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
    })
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
