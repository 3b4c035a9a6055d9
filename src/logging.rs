//! Structured logging setup
//!
//! Logs go to stderr so JSON printed on stdout stays pipeable.

use std::env;
use std::io;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Json,
  Pretty,
  Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
  /// Filter directive used when `RUST_LOG` is not set
  pub level: String,
  pub format: LogFormat,
  /// Include source file and line numbers
  pub include_location: bool,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      format: LogFormat::Pretty,
      include_location: false,
    }
  }
}

impl LoggingConfig {
  /// Read `RUST_LOG`, `LOG_FORMAT` and `LOG_INCLUDE_LOCATION`
  pub fn from_env() -> Self {
    let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let format = match env::var("LOG_FORMAT").as_deref() {
      Ok("json") => LogFormat::Json,
      Ok("compact") => LogFormat::Compact,
      _ => LogFormat::Pretty,
    };

    Self {
      level,
      format,
      include_location: env::var("LOG_INCLUDE_LOCATION").is_ok(),
    }
  }

  /// Install the global subscriber. Fails if one is already set.
  pub fn init(&self) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
      .or_else(|_| EnvFilter::try_new(&self.level))
      .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match self.format {
      LogFormat::Json => {
        let layer = fmt::layer()
          .with_file(self.include_location)
          .with_line_number(self.include_location)
          .with_target(true)
          .with_writer(io::stderr)
          .json();
        registry.with(layer).try_init()?;
      }
      LogFormat::Pretty => {
        let layer = fmt::layer()
          .with_file(self.include_location)
          .with_line_number(self.include_location)
          .with_target(true)
          .with_writer(io::stderr);
        registry.with(layer).try_init()?;
      }
      LogFormat::Compact => {
        let layer = fmt::layer()
          .compact()
          .with_target(false)
          .with_writer(io::stderr);
        registry.with(layer).try_init()?;
      }
    }

    debug!(level = %self.level, format = ?self.format, "Logging initialized");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn test_from_env_reads_format_and_level() {
    temp_env::with_vars(
      [
        ("RUST_LOG", Some("run_fuel_lib=debug")),
        ("LOG_FORMAT", Some("json")),
        ("LOG_INCLUDE_LOCATION", Some("1")),
      ],
      || {
        let config = LoggingConfig::from_env();
        assert_eq!(config.level, "run_fuel_lib=debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.include_location);
      },
    );
  }

  #[test]
  #[serial]
  fn test_from_env_defaults() {
    temp_env::with_vars(
      [
        ("RUST_LOG", None::<&str>),
        ("LOG_FORMAT", Some("fancy")),
        ("LOG_INCLUDE_LOCATION", None),
      ],
      || {
        let config = LoggingConfig::from_env();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.include_location);
      },
    );
  }
}
