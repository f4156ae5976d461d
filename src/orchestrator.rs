//! Probe cycle orchestration.
//!
//! Drives `probe → aggregate → persist → sleep` until shutdown is requested.
//! Errors escaping a cycle never stop the loop: they are logged and the next
//! cycle is retried after a bounded exponential back-off.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::collector::CollectorError;
use crate::collector::dns::DnsAggregator;
use crate::collector::ping::PingAggregator;
use crate::shutdown::ShutdownSignal;
use crate::storage::{MetricsSink, Sample, StorageError, format_latency};

/// Default interval between cycles (1 second).
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(1);

/// Default first back-off after a failed cycle (5 seconds).
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(5);

/// Default back-off ceiling (60 seconds).
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Errors that escape a single cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    /// A collector could not complete.
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),

    /// The sample could not be persisted.
    #[error("sink error: {0}")]
    Sink(#[from] StorageError),

    /// The sink task panicked or was cancelled.
    #[error("sink task failed: {0}")]
    SinkTask(#[source] tokio::task::JoinError),
}

/// Bounded exponential back-off.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF)
    }
}

impl Backoff {
    /// Create a back-off starting at `initial` and doubling up to `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            next: initial,
        }
    }

    /// Delay to wait now; doubles the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

/// Orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What happened during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles whose sample reached the sink.
    pub cycles_completed: u64,
    /// Cycles that ended in a [`CycleError`].
    pub cycle_failures: u64,
    pub uptime: Duration,
}

/// Runs probe cycles until shutdown is requested.
pub struct Orchestrator {
    dns: DnsAggregator,
    ping: PingAggregator,
    sink: Arc<dyn MetricsSink>,
    shutdown: ShutdownSignal,
    interval: Duration,
    backoff: Backoff,
    state: RunState,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("dns", &self.dns)
            .field("ping", &self.ping)
            .field("interval", &self.interval)
            .field("backoff", &self.backoff)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        dns: DnsAggregator,
        ping: PingAggregator,
        sink: Arc<dyn MetricsSink>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            dns,
            ping,
            sink,
            shutdown,
            interval: DEFAULT_CYCLE_INTERVAL,
            backoff: Backoff::default(),
            state: RunState::Init,
        }
    }

    /// Set the sleep between cycles.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the restart back-off.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "Orchestrator state change");
        self.state = next;
    }

    /// Run cycles until shutdown is requested, then return a summary.
    ///
    /// Shutdown is only observed between cycles; the sleep after a cycle
    /// (or a back-off delay) ends early when shutdown is requested.
    pub async fn run(mut self) -> RunSummary {
        let started = Instant::now();
        let mut cycles_completed = 0u64;
        let mut cycle_failures = 0u64;
        let mut consecutive_failures = 0u32;

        self.transition(RunState::Running);
        tracing::info!(interval = ?self.interval, "Probe loop started");

        while !self.shutdown.is_requested() {
            let pause = match self.run_cycle().await {
                Ok(sample) => {
                    cycles_completed += 1;
                    if consecutive_failures > 0 {
                        tracing::info!(consecutive_failures, "Probe loop recovered");
                    }
                    consecutive_failures = 0;
                    self.backoff.reset();
                    tracing::info!(
                        dns_latency_ms = %format_latency(sample.dns_latency_ms),
                        ping_latency_ms = %format_latency(sample.ping_latency_ms),
                        "Cycle complete"
                    );
                    self.interval
                }
                Err(e) => {
                    cycle_failures += 1;
                    consecutive_failures += 1;
                    let delay = self.backoff.next_delay();
                    tracing::error!(
                        error = %e,
                        consecutive_failures,
                        retry_in = ?delay,
                        "Unhandled error in probe cycle, restarting"
                    );
                    delay
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.shutdown.requested() => {}
            }
        }

        self.transition(RunState::Stopping);
        let uptime = started.elapsed();
        tracing::info!(
            cycles_completed,
            cycle_failures,
            uptime = %humantime::format_duration(truncate_to_millis(uptime)),
            "Probe loop stopped"
        );
        self.transition(RunState::Stopped);

        RunSummary {
            cycles_completed,
            cycle_failures,
            uptime,
        }
    }

    /// Run one cycle: probe both categories, build a sample, persist it.
    pub async fn run_cycle(&self) -> Result<Sample, CycleError> {
        let (dns, ping) = tokio::join!(self.dns.collect(), self.ping.collect());
        let (dns, ping) = (dns?, ping?);

        tracing::debug!(
            servers_ms = %dns.servers_only,
            zone_ms = %format_latency(dns.zone_latency_ms()),
            combined_ms = %dns.combined,
            failures = dns.combined.failures,
            "DNS breakdown"
        );

        let sample = Sample::new(dns.combined.mean_ms, ping.aggregate.mean_ms);

        // File I/O stays off the runtime threads; a panicking sink surfaces
        // as a JoinError instead of unwinding through the loop.
        let sink = Arc::clone(&self.sink);
        let row = sample.clone();
        tokio::task::spawn_blocking(move || sink.append(&row))
            .await
            .map_err(CycleError::SinkTask)??;
        Ok(sample)
    }
}

/// Drop sub-millisecond precision for human-readable durations.
fn truncate_to_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis().min(u64::MAX as u128) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_max() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(30));

        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay().as_secs()).collect();

        assert_eq!(delays, [5, 10, 20, 30, 30]);
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::default();
        backoff.next_delay();
        backoff.next_delay();

        backoff.reset();

        assert_eq!(backoff.next_delay(), DEFAULT_INITIAL_BACKOFF);
    }

    #[test]
    fn test_backoff_max_below_initial() {
        let mut backoff = Backoff::new(Duration::from_secs(10), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::Running.to_string(), "running");
        assert_eq!(RunState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_truncate_to_millis() {
        assert_eq!(
            truncate_to_millis(Duration::from_micros(1_234_567)),
            Duration::from_millis(1_234)
        );
    }
}
