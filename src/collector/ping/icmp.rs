//! Native ICMP echo via `surge-ping`.
//!
//! Opening ICMP sockets usually requires root, `CAP_NET_RAW`, or an
//! unprivileged ping group (`net.ipv4.ping_group_range`).

use std::net::IpAddr;
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};

use super::collector::Pinger;
use crate::collector::traits::{ProbeError, duration_ms};

/// Resolve hostname to IP address.
async fn resolve_host(host: &str) -> Result<IpAddr, ProbeError> {
    // First, try to parse as an IP address directly
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let mut addrs = tokio::net::lookup_host(format!("{host}:0"))
        .await
        .map_err(|e| ProbeError::Unavailable(format!("failed to resolve {host}: {e}")))?;
    addrs
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| ProbeError::Unavailable(format!("no addresses found for {host}")))
}

/// Sends a single ICMP echo request per probe.
#[derive(Debug, Clone)]
pub struct IcmpPinger {
    timeout: Duration,
}

impl IcmpPinger {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait::async_trait]
impl Pinger for IcmpPinger {
    async fn ping(&self, host: &str) -> Result<f64, ProbeError> {
        let ip_addr = resolve_host(host).await?;

        // Create ICMP client based on IP version
        let client = match ip_addr {
            IpAddr::V4(_) => Client::new(&Config::default()),
            IpAddr::V6(_) => Client::new(&Config::builder().kind(ICMP::V6).build()),
        }
        .map_err(|e| ProbeError::Unavailable(format!("failed to create ICMP client: {e}")))?;

        let mut pinger = client.pinger(ip_addr, PingIdentifier(rand::random())).await;
        pinger.timeout(self.timeout);

        match pinger.ping(PingSequence(0), &[]).await {
            Ok((_, rtt)) => Ok(duration_ms(rtt)),
            Err(SurgeError::Timeout { .. }) => Err(ProbeError::Timeout(self.timeout)),
            Err(e) => Err(ProbeError::Unavailable(e.to_string())),
        }
    }
}
