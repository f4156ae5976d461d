//! Core data types for the storage layer.

use chrono::{DateTime, Local};

/// Column names of the record file.
pub const CSV_HEADER: [&str; 3] = ["Local_Date", "DNS_Latency_ms", "PING_Latency_ms"];

/// Marker written in place of a latency when a category had no data.
pub const NO_DATA: &str = "NA";

/// Timestamp layout for the `Local_Date` column.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Format a latency with four decimals, or [`NO_DATA`].
pub fn format_latency(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{ms:.4}"),
        None => NO_DATA.to_string(),
    }
}

/// One cycle's measurements.
///
/// Created fresh every cycle and handed to the sink; a `None` latency means
/// every probe of that category failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Local wall-clock time at which the cycle's probes completed.
    pub timestamp: DateTime<Local>,
    pub dns_latency_ms: Option<f64>,
    pub ping_latency_ms: Option<f64>,
}

impl Sample {
    /// Create a sample stamped with the current local time.
    pub fn new(dns_latency_ms: Option<f64>, ping_latency_ms: Option<f64>) -> Self {
        Self::at(Local::now(), dns_latency_ms, ping_latency_ms)
    }

    pub fn at(
        timestamp: DateTime<Local>,
        dns_latency_ms: Option<f64>,
        ping_latency_ms: Option<f64>,
    ) -> Self {
        Self {
            timestamp,
            dns_latency_ms,
            ping_latency_ms,
        }
    }

    /// Render the sample as one CSV line (without trailing newline).
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            format_latency(self.dns_latency_ms),
            format_latency(self.ping_latency_ms),
        )
    }
}
