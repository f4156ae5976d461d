//! DNS collectors for probing resolver latency.
//!
//! - [`DnsAggregator`]: TCP query latency per provider address plus a zone-authority lookup
//! - [`HickoryProber`]: production [`DnsProber`] backed by `hickory-resolver`

mod collector;
mod resolver;

pub use collector::{DnsAggregator, DnsConfig, DnsProber, DnsReport, ProviderEndpoint};
pub use resolver::HickoryProber;
