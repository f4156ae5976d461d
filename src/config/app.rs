//! Application configuration structures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::dns::DnsConfig;
use crate::collector::ping::PingConfig;
use crate::orchestrator::{Backoff, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF};

use super::validation::{ConfigError, parse_interval, parse_level};

// =============================================================================
// Constants
// =============================================================================

/// Default log level.
pub const DEFAULT_LEVEL: &str = "INFO";

/// Default seconds between cycles.
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Default CSV output path.
pub const DEFAULT_CSV_PATH: &str = "uuiperf.csv";

/// Approximate bytes per CSV row, used for the disk usage estimate.
pub const CSV_LINE_LENGTH: f64 = 42.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

fn default_initial_backoff() -> Duration {
    DEFAULT_INITIAL_BACKOFF
}

fn default_max_backoff() -> Duration {
    DEFAULT_MAX_BACKOFF
}

// =============================================================================
// Restart Configuration
// =============================================================================

/// Back-off applied after a cycle fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartConfig {
    /// First delay after a failed cycle (default: 5s).
    #[serde(default = "default_initial_backoff", with = "humantime_serde")]
    pub initial_backoff: Duration,

    /// Upper bound for the doubling delay (default: 60s).
    #[serde(default = "default_max_backoff", with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RestartConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_backoff, self.max_backoff)
    }
}

// =============================================================================
// Command line overrides
// =============================================================================

/// Values given on the command line or through the environment.
///
/// Anything left `None` keeps the value from the file (or the default).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub level: Option<String>,
    pub interval: Option<f64>,
    pub csvpath: Option<PathBuf>,
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log level name or numeric severity (default: "INFO").
    pub level: String,

    /// Seconds between cycles (default: 1.0).
    pub interval: f64,

    /// CSV output path (default: "uuiperf.csv").
    pub csvpath: PathBuf,

    pub dns: DnsConfig,

    pub ping: PingConfig,

    pub restart: RestartConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            interval: DEFAULT_INTERVAL_SECS,
            csvpath: PathBuf::from(DEFAULT_CSV_PATH),
            dns: DnsConfig::default(),
            ping: PingConfig::default(),
            restart: RestartConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// The result is not validated: command line overrides are applied
    /// first, then [`AppConfig::validate`] is called on the merged config.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Replace file values with the ones given on the command line.
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(level) = overrides.level {
            self.level = level;
        }
        if let Some(interval) = overrides.interval {
            self.interval = interval;
        }
        if let Some(csvpath) = overrides.csvpath {
            self.csvpath = csvpath;
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_level(&self.level)?;
        parse_interval(self.interval)?;

        if self.csvpath.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "csvpath must not be empty".to_string(),
            ));
        }

        self.dns
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("dns: {e}")))?;
        self.ping
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("ping: {e}")))?;

        if self.restart.initial_backoff.is_zero() {
            return Err(ConfigError::ValidationError(
                "restart initial_backoff must be positive".to_string(),
            ));
        }
        if self.restart.initial_backoff > self.restart.max_backoff {
            return Err(ConfigError::ValidationError(format!(
                "restart initial_backoff ({}) exceeds max_backoff ({})",
                humantime::format_duration(self.restart.initial_backoff),
                humantime::format_duration(self.restart.max_backoff)
            )));
        }

        Ok(())
    }

    /// Cycle interval as a duration.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if the interval is not a
    /// finite positive number.
    pub fn interval_duration(&self) -> Result<Duration, ConfigError> {
        parse_interval(self.interval)
    }

    /// Estimated CSV growth in KiB per day at the configured interval.
    pub fn csv_kib_per_day(&self) -> f64 {
        SECONDS_PER_DAY / self.interval * CSV_LINE_LENGTH / 1024.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::FailurePolicy;
    use crate::collector::ping::PingMethod;

    #[test]
    fn test_restart_config_default() {
        let config = RestartConfig::default();
        assert_eq!(config.initial_backoff, Duration::from_secs(5));
        assert_eq!(config.max_backoff, Duration::from_secs(60));
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.level, "INFO");
        assert_eq!(config.interval, 1.0);
        assert_eq!(config.csvpath, PathBuf::from("uuiperf.csv"));
        assert_eq!(config.dns.providers.len(), 4);
        assert_eq!(config.ping.hosts.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_empty_document() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config.interval, DEFAULT_INTERVAL_SECS);
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r#"
level: debug
interval: 0.5
csvpath: /tmp/perf.csv
dns:
  query_name: example.org
  timeout: 2s
  failure_policy: count_as_zero
  providers:
    - name: Cloudflare
      addresses: [1.1.1.1, 1.0.0.1]
ping:
  hosts: [127.0.0.1]
  method: icmp
restart:
  initial_backoff: 1s
  max_backoff: 10s
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.level, "debug");
        assert_eq!(config.interval, 0.5);
        assert_eq!(config.csvpath, PathBuf::from("/tmp/perf.csv"));
        assert_eq!(config.dns.query_name, "example.org");
        assert_eq!(config.dns.timeout, Duration::from_secs(2));
        assert_eq!(config.dns.failure_policy, FailurePolicy::CountAsZero);
        assert_eq!(config.dns.providers.len(), 1);
        assert_eq!(config.dns.providers[0].addresses.len(), 2);
        assert_eq!(config.ping.hosts, ["127.0.0.1"]);
        assert_eq!(config.ping.method, PingMethod::Icmp);
        assert_eq!(config.restart.max_backoff, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial_keeps_defaults() {
        let config = AppConfig::from_yaml("interval: 2.0\n").unwrap();
        assert_eq!(config.interval, 2.0);
        assert_eq!(config.level, DEFAULT_LEVEL);
        assert_eq!(config.restart, RestartConfig::default());
    }

    #[test]
    fn test_from_yaml_invalid() {
        let result = AppConfig::from_yaml("interval: [not, a, number]\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load("/nonexistent/uuiperf.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uuiperf.yaml");
        std::fs::write(&path, "level: WARNING\ncsvpath: out.csv\n").unwrap();

        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.level, "WARNING");
        assert_eq!(config.csvpath, PathBuf::from("out.csv"));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = AppConfig::from_yaml("level: debug\ninterval: 5.0\n").unwrap();

        config.apply_overrides(Overrides {
            level: None,
            interval: Some(0.25),
            csvpath: Some(PathBuf::from("cli.csv")),
        });

        // Unset overrides keep the file value.
        assert_eq!(config.level, "debug");
        assert_eq!(config.interval, 0.25);
        assert_eq!(config.csvpath, PathBuf::from("cli.csv"));
    }

    #[test]
    fn test_validation_invalid_interval() {
        let config = AppConfig {
            interval: 0.0,
            ..AppConfig::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("interval"));
    }

    #[test]
    fn test_validation_invalid_level() {
        let config = AppConfig {
            level: "chatty".to_string(),
            ..AppConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_no_providers() {
        let mut config = AppConfig::default();
        config.dns.providers.clear();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("dns"));
    }

    #[test]
    fn test_validation_no_hosts() {
        let mut config = AppConfig::default();
        config.ping.hosts.clear();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ping"));
    }

    #[test]
    fn test_validation_backoff_order() {
        let config = AppConfig {
            restart: RestartConfig {
                initial_backoff: Duration::from_secs(30),
                max_backoff: Duration::from_secs(10),
            },
            ..AppConfig::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("max_backoff"));
    }

    #[test]
    fn test_interval_duration() {
        let config = AppConfig {
            interval: 0.01,
            ..AppConfig::default()
        };
        assert_eq!(config.interval_duration().unwrap(), Duration::from_millis(10));
    }

    #[test]
    fn test_csv_kib_per_day() {
        let config = AppConfig::default();
        // 86400 rows of 42 bytes.
        assert!((config.csv_kib_per_day() - 3543.75).abs() < 1e-9);
    }
}
