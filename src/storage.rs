//! Storage Layer
//!
//! Append-only CSV persistence for cycle samples:
//! - **Header**: written once when the sink is initialized (file truncated)
//! - **Rows**: one per cycle, each append opens, writes, flushes and closes the file
//!
//! # Components
//!
//! - [`Sample`]: one cycle's timestamped DNS and ping latency
//! - [`MetricsSink`]: sink interface used by the orchestrator
//! - [`CsvSink`]: file-backed sink

mod csv_sink;
mod error;
mod types;

pub use csv_sink::{CsvSink, MetricsSink};
pub use error::StorageError;
pub use types::{CSV_HEADER, NO_DATA, Sample, format_latency};
