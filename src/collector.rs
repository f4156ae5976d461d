//! Collector Layer
//!
//! Probe aggregators that measure one latency category per cycle. Each
//! aggregator fans its probes out onto a Tokio `JoinSet`, applies a per-probe
//! deadline, and reduces the outcomes with [`aggregate`].
//!
//! # Architecture
//!
//! - [`ProbeOutcome`] / [`ProbeError`]: result of a single probe
//! - [`FailurePolicy`]: whether failures are excluded from or counted in the mean
//! - [`dns::DnsAggregator`]: DNS query latency behind a [`dns::DnsProber`]
//! - [`ping::PingAggregator`]: echo round-trip latency behind a [`ping::Pinger`]
//!
//! # Example
//!
//! ```rust,no_run
//! use uuiperf::collector::ping::{PingAggregator, PingConfig};
//!
//! # async fn run() -> Result<(), uuiperf::collector::CollectorError> {
//! let aggregator = PingAggregator::from_config(PingConfig::new(["1.1.1.1"]));
//! let report = aggregator.collect().await?;
//! println!("ping: {}", report.aggregate);
//! # Ok(())
//! # }
//! ```

pub mod dns;
pub mod ping;
mod traits;

pub use traits::{
    CollectorError, FailurePolicy, LatencyAggregate, ProbeError, ProbeOutcome, ProbeRecord,
    aggregate, duration_ms, timed, with_deadline,
};
