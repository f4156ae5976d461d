//! Ping latency aggregator.
//!
//! Sends one echo to every configured host per cycle. Each probe runs on its
//! own task with a deadline so a slow host or a stuck external process never
//! holds up the rest of the cycle.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use super::command::CommandPinger;
use super::icmp::IcmpPinger;
use crate::collector::traits::{
    CollectorError, FailurePolicy, LatencyAggregate, ProbeError, ProbeOutcome, ProbeRecord,
    aggregate, join_ordered, with_deadline,
};

/// Default echo wait (1 second).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Extra time granted on top of the echo wait for process start-up and
/// hostname resolution.
const PROBE_GRACE: Duration = Duration::from_secs(1);

/// Default ping program.
const DEFAULT_PROGRAM: &str = "ping";

/// Built-in host list.
pub fn default_hosts() -> Vec<String> {
    ["dns.google.com", "yahoo.com", "ping.ubnt.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_program() -> String {
    DEFAULT_PROGRAM.to_string()
}

/// How echo requests are sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PingMethod {
    /// Run the external ping utility.
    #[default]
    Command,
    /// Send ICMP packets directly (needs raw socket privileges).
    Icmp,
}

/// Configuration for the ping aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingConfig {
    /// Hosts to ping (hostnames or IP addresses).
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,
    /// Echo wait per host (default: 1s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Probe method (default: command).
    #[serde(default)]
    pub method: PingMethod,
    /// Program used by the command method (default: `ping`).
    #[serde(default = "default_program")]
    pub program: String,
    /// How failed probes enter the mean (default: exclude).
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self::new(default_hosts())
    }
}

impl PingConfig {
    /// Create a ping configuration for `hosts`.
    pub fn new(hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_TIMEOUT,
            method: PingMethod::default(),
            program: DEFAULT_PROGRAM.to_string(),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.hosts.is_empty() {
            return Err("at least one host is required".to_string());
        }
        if self.hosts.iter().any(|h| h.trim().is_empty()) {
            return Err("host cannot be empty".to_string());
        }
        if self.timeout.is_zero() {
            return Err("timeout must be positive".to_string());
        }
        if self.method == PingMethod::Command && self.program.trim().is_empty() {
            return Err("program cannot be empty".to_string());
        }
        Ok(())
    }

    /// Deadline applied to each probe task.
    pub fn deadline(&self) -> Duration {
        self.timeout + PROBE_GRACE
    }

    /// Set the echo wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the probe method.
    pub fn with_method(mut self, method: PingMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the ping program.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Echo facility used by the aggregator.
#[async_trait::async_trait]
pub trait Pinger: Send + Sync + 'static {
    /// Send one echo to `host` and return the round-trip time in milliseconds.
    async fn ping(&self, host: &str) -> Result<f64, ProbeError>;
}

/// One cycle of ping measurements.
#[derive(Debug, Clone)]
pub struct PingReport {
    /// Per-host outcomes, in configuration order.
    pub hosts: Vec<ProbeRecord>,
    pub aggregate: LatencyAggregate,
}

/// Pings every configured host once per cycle.
pub struct PingAggregator {
    config: PingConfig,
    pinger: Arc<dyn Pinger>,
}

impl std::fmt::Debug for PingAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PingAggregator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PingAggregator {
    /// Create a new aggregator with the given configuration and pinger.
    pub fn new(config: PingConfig, pinger: Arc<dyn Pinger>) -> Self {
        Self { config, pinger }
    }

    /// Create an aggregator using the pinger selected by `config.method`.
    pub fn from_config(config: PingConfig) -> Self {
        let pinger: Arc<dyn Pinger> = match config.method {
            PingMethod::Command => Arc::new(CommandPinger::new(&config.program, config.timeout)),
            PingMethod::Icmp => Arc::new(IcmpPinger::new(config.timeout)),
        };
        Self::new(config, pinger)
    }

    pub fn config(&self) -> &PingConfig {
        &self.config
    }

    /// Run one cycle of probes.
    pub async fn collect(&self) -> Result<PingReport, CollectorError> {
        let mut tasks = JoinSet::new();
        let deadline = self.config.deadline();

        for (index, host) in self.config.hosts.iter().cloned().enumerate() {
            let pinger = Arc::clone(&self.pinger);

            tasks.spawn(async move {
                let outcome = with_deadline(deadline, pinger.ping(&host)).await;

                match &outcome {
                    ProbeOutcome::Success { latency_ms } => {
                        tracing::debug!(host = %host, latency_ms, "Ping probe successful");
                    }
                    ProbeOutcome::Failure { reason } => {
                        tracing::error!(host = %host, error = %reason, "Ping probe failed");
                    }
                }

                (index, ProbeRecord::new(host, outcome))
            });
        }

        let hosts = join_ordered(tasks).await?;
        let aggregate = aggregate(hosts.iter().map(|r| &r.outcome), self.config.failure_policy);

        Ok(PingReport { hosts, aggregate })
    }
}
