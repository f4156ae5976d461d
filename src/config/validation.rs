//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;
use tracing::level_filters::LevelFilter;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse a logging level.
///
/// Accepts level names (`trace`, `debug`, `info`, `warn`/`warning`, `error`,
/// `critical`, `off`) in any case, and numeric severities in steps of ten
/// (`10` = debug, `20` = info, `30` = warn, `40`/`50` = error, `0` = trace).
///
/// # Examples
///
/// ```
/// use tracing::level_filters::LevelFilter;
/// use uuiperf::config::parse_level;
///
/// assert_eq!(parse_level("INFO").unwrap(), LevelFilter::INFO);
/// assert_eq!(parse_level("10").unwrap(), LevelFilter::DEBUG);
/// ```
pub fn parse_level(level: &str) -> Result<LevelFilter, ConfigError> {
    let level = level.trim();

    if let Ok(severity) = level.parse::<u32>() {
        return match severity {
            0..=9 => Ok(LevelFilter::TRACE),
            10..=19 => Ok(LevelFilter::DEBUG),
            20..=29 => Ok(LevelFilter::INFO),
            30..=39 => Ok(LevelFilter::WARN),
            40..=50 => Ok(LevelFilter::ERROR),
            _ => Err(ConfigError::ValidationError(format!(
                "log level {severity} out of range 0-50"
            ))),
        };
    }

    match level.to_ascii_lowercase().as_str() {
        "trace" | "notset" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "error" | "critical" | "fatal" => Ok(LevelFilter::ERROR),
        "off" => Ok(LevelFilter::OFF),
        _ => Err(ConfigError::ValidationError(format!(
            "invalid log level: '{level}'"
        ))),
    }
}

/// Convert an interval in (fractional) seconds to a duration.
///
/// The interval must be finite and strictly positive.
pub fn parse_interval(seconds: f64) -> Result<Duration, ConfigError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "interval must be a positive number of seconds, got {seconds}"
        )));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| ConfigError::ValidationError(format!("interval {seconds}: {e}")))
}
