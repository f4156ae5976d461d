//! uuiperf - Internet Latency Sampler
//!
//! Periodically measures DNS resolution latency against a set of public
//! providers and ICMP round-trip latency against a set of hosts, reduces each
//! category to a single mean per cycle, and appends one timestamped row per
//! cycle to a CSV file. Runs until SIGINT or SIGTERM.
//!
//! # Architecture
//!
//! - **Collectors**: concurrent DNS and ping probes behind prober traits
//! - **Storage**: append-only CSV sink
//! - **Orchestrator**: probe, aggregate, persist, sleep; back-off on failure
//! - **Shutdown**: signal handling via a cancellation token
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use uuiperf::collector::dns::{DnsAggregator, DnsConfig, HickoryProber};
//! use uuiperf::collector::ping::{PingAggregator, PingConfig};
//! use uuiperf::orchestrator::Orchestrator;
//! use uuiperf::shutdown::ShutdownCoordinator;
//! use uuiperf::storage::{CsvSink, MetricsSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dns_config = DnsConfig::default();
//!     let dns = DnsAggregator::new(
//!         dns_config.clone(),
//!         Arc::new(HickoryProber::from_system_conf(&dns_config)),
//!     );
//!     let ping = PingAggregator::from_config(PingConfig::default());
//!
//!     let sink = Arc::new(CsvSink::new("uuiperf.csv"));
//!     sink.initialize()?;
//!
//!     let shutdown = ShutdownCoordinator::new();
//!     shutdown.install()?;
//!
//!     let summary = Orchestrator::new(dns, ping, sink, shutdown.signal()).run().await;
//!     println!("{} cycles", summary.cycles_completed);
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod orchestrator;
pub mod shutdown;
pub mod storage;

// Re-export commonly used types
pub use collector::{FailurePolicy, LatencyAggregate, ProbeError, ProbeOutcome};
pub use config::{AppConfig, ConfigError};
pub use orchestrator::{Backoff, Orchestrator, RunSummary};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
pub use storage::{CsvSink, MetricsSink, Sample, StorageError};
