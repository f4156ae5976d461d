//! DNS latency aggregator.
//!
//! Issues one query per provider address and one zone-authority lookup per
//! cycle, then reduces the outcomes to a single mean latency.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::proto::rr::RecordType;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::collector::traits::{
    CollectorError, FailurePolicy, LatencyAggregate, ProbeError, ProbeOutcome, ProbeRecord,
    aggregate, duration_ms, join_ordered, with_deadline,
};

/// Default query name.
const DEFAULT_QUERY_NAME: &str = "uui.org";

/// Default per-query timeout (1 second).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default zone-authority lookup timeout (1 second).
const DEFAULT_ZONE_TIMEOUT: Duration = Duration::from_secs(1);

/// Target label used for the zone-authority probe.
const ZONE_TARGET: &str = "zone";

fn default_query_name() -> String {
    DEFAULT_QUERY_NAME.to_string()
}

fn default_record_type() -> RecordType {
    RecordType::A
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_zone_timeout() -> Duration {
    DEFAULT_ZONE_TIMEOUT
}

/// Built-in provider table.
pub fn default_providers() -> Vec<ProviderEndpoint> {
    let v4 = |a, b, c, d| IpAddr::V4(Ipv4Addr::new(a, b, c, d));
    vec![
        ProviderEndpoint::new(
            "Cisco OpenDNS",
            [v4(208, 67, 222, 222), v4(208, 67, 220, 220)],
        ),
        ProviderEndpoint::new("Cloudflare", [v4(1, 1, 1, 1), v4(1, 0, 0, 1)]),
        ProviderEndpoint::new("Google", [v4(8, 8, 8, 8), v4(8, 8, 4, 4)]),
        ProviderEndpoint::new("Quad9", [v4(149, 112, 112, 112)]),
    ]
}

/// A named DNS service reachable on one or more addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    pub name: String,
    pub addresses: Vec<IpAddr>,
}

impl ProviderEndpoint {
    pub fn new(name: impl Into<String>, addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            name: name.into(),
            addresses: addresses.into_iter().collect(),
        }
    }
}

/// Configuration for the DNS aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Name queried against every provider (default: `uui.org`).
    #[serde(default = "default_query_name")]
    pub query_name: String,
    /// Record type queried (default: `A`).
    #[serde(default = "default_record_type", with = "record_type_serde")]
    pub record_type: RecordType,
    /// Per-query timeout (default: 1s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Zone-authority lookup timeout (default: 1s).
    #[serde(default = "default_zone_timeout", with = "humantime_serde")]
    pub zone_timeout: Duration,
    /// How failed probes enter the mean (default: exclude).
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Providers to probe.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderEndpoint>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_NAME)
    }
}

impl DnsConfig {
    /// Create a configuration for `query_name` with the built-in providers.
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            record_type: RecordType::A,
            timeout: DEFAULT_TIMEOUT,
            zone_timeout: DEFAULT_ZONE_TIMEOUT,
            failure_policy: FailurePolicy::default(),
            providers: default_providers(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.query_name.trim().is_empty() {
            return Err("query_name cannot be empty".to_string());
        }
        if self.timeout.is_zero() || self.zone_timeout.is_zero() {
            return Err("timeouts must be positive".to_string());
        }
        if self.providers.is_empty() {
            return Err("at least one provider is required".to_string());
        }
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err("provider name cannot be empty".to_string());
            }
            if provider.addresses.is_empty() {
                return Err(format!("provider '{}' has no addresses", provider.name));
            }
        }
        Ok(())
    }

    /// Set the record type.
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Set the per-query timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the zone lookup timeout.
    pub fn with_zone_timeout(mut self, timeout: Duration) -> Self {
        self.zone_timeout = timeout;
        self
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Replace the provider table.
    pub fn with_providers(mut self, providers: Vec<ProviderEndpoint>) -> Self {
        self.providers = providers;
        self
    }
}

mod record_type_serde {
    use std::str::FromStr;

    use hickory_resolver::proto::rr::RecordType;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &RecordType, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RecordType, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RecordType::from_str(&raw.to_ascii_uppercase()).map_err(serde::de::Error::custom)
    }
}

/// Network side of the DNS aggregator.
///
/// Implementations measure their own latency so that the aggregator stays a
/// pure reduction over outcomes.
#[async_trait::async_trait]
pub trait DnsProber: Send + Sync + 'static {
    /// Send one query for `name` to `server` and return the time to response.
    ///
    /// A response without records (NXDOMAIN, NODATA) is still a response.
    async fn query(
        &self,
        server: IpAddr,
        name: &str,
        record_type: RecordType,
    ) -> Result<Duration, ProbeError>;

    /// Find the zone holding `name` and return `(zone, elapsed)`.
    async fn zone_for_name(&self, name: &str) -> Result<(String, Duration), ProbeError>;
}

/// One cycle of DNS measurements.
#[derive(Debug, Clone)]
pub struct DnsReport {
    /// Per-address query outcomes, in provider table order.
    pub servers: Vec<ProbeRecord>,
    /// Zone-authority lookup outcome.
    pub zone: ProbeRecord,
    /// Mean over servers and zone lookup; this is the recorded DNS latency.
    pub combined: LatencyAggregate,
    /// Mean over the per-address queries only.
    pub servers_only: LatencyAggregate,
}

impl DnsReport {
    pub fn zone_latency_ms(&self) -> Option<f64> {
        self.zone.outcome.latency_ms()
    }
}

/// Probes every provider address and the zone authority once per cycle.
pub struct DnsAggregator {
    config: DnsConfig,
    prober: Arc<dyn DnsProber>,
}

impl std::fmt::Debug for DnsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsAggregator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DnsAggregator {
    /// Create a new aggregator with the given configuration and prober.
    pub fn new(config: DnsConfig, prober: Arc<dyn DnsProber>) -> Self {
        Self { config, prober }
    }

    pub fn config(&self) -> &DnsConfig {
        &self.config
    }

    /// Run one cycle of probes.
    ///
    /// Individual probe failures are recorded in the report; only a probe
    /// task dying is an error.
    pub async fn collect(&self) -> Result<DnsReport, CollectorError> {
        let mut tasks = JoinSet::new();

        let targets = self
            .config
            .providers
            .iter()
            .flat_map(|p| p.addresses.iter().map(move |addr| (p.name.clone(), *addr)));

        for (index, (provider, server)) in targets.enumerate() {
            let prober = Arc::clone(&self.prober);
            let name = self.config.query_name.clone();
            let record_type = self.config.record_type;
            let limit = self.config.timeout;

            tasks.spawn(async move {
                let outcome = with_deadline(limit, async {
                    let elapsed = prober.query(server, &name, record_type).await?;
                    Ok(duration_ms(elapsed))
                })
                .await;

                match &outcome {
                    ProbeOutcome::Success { latency_ms } => {
                        tracing::debug!(provider = %provider, server = %server, latency_ms, "DNS probe successful");
                    }
                    ProbeOutcome::Failure { reason } => {
                        tracing::error!(provider = %provider, server = %server, error = %reason, "DNS probe failed");
                    }
                }

                (index, ProbeRecord::new(format!("{provider} {server}"), outcome))
            });
        }

        let (servers, zone) = tokio::join!(join_ordered(tasks), self.lookup_zone());
        let servers = servers?;

        let policy = self.config.failure_policy;
        let servers_only = aggregate(servers.iter().map(|r| &r.outcome), policy);
        let combined = aggregate(
            servers.iter().chain(std::iter::once(&zone)).map(|r| &r.outcome),
            policy,
        );

        Ok(DnsReport {
            servers,
            zone,
            combined,
            servers_only,
        })
    }

    async fn lookup_zone(&self) -> ProbeRecord {
        let name = &self.config.query_name;
        let outcome = with_deadline(self.config.zone_timeout, async {
            let (zone, elapsed) = self.prober.zone_for_name(name).await?;
            tracing::debug!(name = %name, zone = %zone, "Zone authority found");
            Ok(duration_ms(elapsed))
        })
        .await;

        if let ProbeOutcome::Failure { reason } = &outcome {
            tracing::error!(name = %name, error = %reason, "Zone lookup failed");
        }

        ProbeRecord::new(ZONE_TARGET, outcome)
    }
}
