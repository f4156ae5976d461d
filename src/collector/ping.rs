//! Ping collectors for probing host round-trip latency.
//!
//! - [`PingAggregator`]: one echo per host per cycle, averaged over successes
//! - [`CommandPinger`]: runs the system `ping` utility
//! - [`IcmpPinger`]: native ICMP echo via `surge-ping`

mod collector;
mod command;
mod icmp;

pub use collector::{PingAggregator, PingConfig, PingMethod, PingReport, Pinger};
pub use command::{CommandPinger, parse_ping_time};
pub use icmp::IcmpPinger;
