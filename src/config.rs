//! Configuration module for uuiperf.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Logging level, cycle interval and CSV output path
//! - DNS providers, query and failure policy
//! - Ping hosts, method and failure policy
//! - Restart back-off after failed cycles

mod app;
mod validation;

pub use app::{AppConfig, Overrides, RestartConfig};
pub use validation::{ConfigError, parse_interval, parse_level};

// Re-export constants
pub use app::{CSV_LINE_LENGTH, DEFAULT_CSV_PATH, DEFAULT_INTERVAL_SECS, DEFAULT_LEVEL};
