//! Core probe types and the aggregation shared by every collector.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout};

/// Reason a single probe produced no latency.
///
/// Probe errors are observations, not failures of the collector: they are
/// recorded as [`ProbeOutcome::Failure`] and the cycle carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    /// The probe did not finish within its deadline.
    #[error("timeout elapsed after {0:?}")]
    Timeout(Duration),

    /// The probe facility could not be used or reported an error
    /// (non-zero exit status, spawn failure, unreachable host).
    #[error("probe unavailable: {0}")]
    Unavailable(String),

    /// The probe facility answered but no latency could be read from it.
    #[error("unparsable probe output: {0}")]
    Unparsable(String),

    /// DNS transport or protocol error.
    #[error("resolver error: {0}")]
    Resolve(String),
}

/// Errors that abort a whole collection (as opposed to a single probe).
#[derive(Debug, Error)]
pub enum CollectorError {
    /// A probe task panicked or was cancelled.
    #[error("probe task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The target answered; latency is never negative.
    Success { latency_ms: f64 },
    /// The target did not answer usefully.
    Failure { reason: ProbeError },
}

impl ProbeOutcome {
    /// Successful outcome from a measured duration.
    pub fn success(elapsed: Duration) -> Self {
        Self::success_ms(duration_ms(elapsed))
    }

    /// Successful outcome from a latency already expressed in milliseconds.
    pub fn success_ms(latency_ms: f64) -> Self {
        Self::Success {
            latency_ms: latency_ms.max(0.0),
        }
    }

    pub fn failure(reason: ProbeError) -> Self {
        Self::Failure { reason }
    }

    pub fn latency_ms(&self) -> Option<f64> {
        match self {
            Self::Success { latency_ms } => Some(*latency_ms),
            Self::Failure { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// A probe outcome together with the target it was measured against.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRecord {
    /// Human-readable target, e.g. `"Cloudflare 1.1.1.1"` or `"yahoo.com"`.
    pub target: String,
    pub outcome: ProbeOutcome,
}

impl ProbeRecord {
    pub fn new(target: impl Into<String>, outcome: ProbeOutcome) -> Self {
        Self {
            target: target.into(),
            outcome,
        }
    }
}

/// How failed probes take part in the mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Failures are left out of the mean entirely.
    #[default]
    Exclude,
    /// Failures are counted as 0 ms entries (sentinel value).
    CountAsZero,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclude => f.write_str("exclude"),
            Self::CountAsZero => f.write_str("count_as_zero"),
        }
    }
}

/// Cycle-level summary of one probe category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyAggregate {
    /// Mean latency, or `None` when no outcome contributed ("no data").
    pub mean_ms: Option<f64>,
    pub successes: usize,
    pub failures: usize,
}

impl LatencyAggregate {
    pub fn is_no_data(&self) -> bool {
        self.mean_ms.is_none()
    }
}

impl fmt::Display for LatencyAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mean_ms {
            Some(ms) => write!(f, "{ms:.4}"),
            None => f.write_str("n/a"),
        }
    }
}

/// Reduce a cycle's outcomes to their mean latency under `policy`.
///
/// Never divides by zero: when nothing contributes (no outcomes, or only
/// failures under [`FailurePolicy::Exclude`]) the mean is `None`.
pub fn aggregate<'a, I>(outcomes: I, policy: FailurePolicy) -> LatencyAggregate
where
    I: IntoIterator<Item = &'a ProbeOutcome>,
{
    let mut sum = 0.0;
    let mut counted = 0usize;
    let mut successes = 0usize;
    let mut failures = 0usize;

    for outcome in outcomes {
        match outcome {
            ProbeOutcome::Success { latency_ms } => {
                sum += latency_ms;
                counted += 1;
                successes += 1;
            }
            ProbeOutcome::Failure { .. } => {
                failures += 1;
                if policy == FailurePolicy::CountAsZero {
                    counted += 1;
                }
            }
        }
    }

    LatencyAggregate {
        mean_ms: (counted > 0).then(|| sum / counted as f64),
        successes,
        failures,
    }
}

/// Convert a duration to fractional milliseconds.
pub fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

/// Await `probe` and measure how long it took to complete.
pub async fn timed<F, T>(probe: F) -> Result<(T, Duration), ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    let start = Instant::now();
    let value = probe.await?;
    Ok((value, start.elapsed()))
}

/// Run `probe`, which reports its own latency, under `limit`.
pub async fn with_deadline<F>(limit: Duration, probe: F) -> ProbeOutcome
where
    F: Future<Output = Result<f64, ProbeError>>,
{
    match timeout(limit, probe).await {
        Ok(Ok(ms)) => ProbeOutcome::success_ms(ms),
        Ok(Err(e)) => ProbeOutcome::failure(e),
        Err(_) => ProbeOutcome::failure(ProbeError::Timeout(limit)),
    }
}

/// Drain indexed probe tasks and return their records in submission order.
pub(crate) async fn join_ordered(
    mut tasks: JoinSet<(usize, ProbeRecord)>,
) -> Result<Vec<ProbeRecord>, CollectorError> {
    let mut records = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        records.push(joined?);
    }
    records.sort_by_key(|(index, _)| *index);
    Ok(records.into_iter().map(|(_, record)| record).collect())
}
