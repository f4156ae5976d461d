//! Ping through the system `ping` utility.

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;

use super::collector::Pinger;
use crate::collector::traits::ProbeError;

/// Extract the round-trip time in milliseconds from ping output.
///
/// Accepts `time=12.3 ms`, `time=12 ms`, `time=0.045ms` and `time<1 ms`.
pub fn parse_ping_time(output: &str) -> Option<f64> {
    static TIME_REGEX: OnceLock<Regex> = OnceLock::new();

    let regex = TIME_REGEX.get_or_init(|| {
        Regex::new(r"time[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms").expect("failed to compile ping time regex")
    });

    regex
        .captures(output)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}

/// Runs `<program> -c 1 -W <wait> <host>` once per probe.
///
/// The child is spawned asynchronously and killed if the probe is dropped
/// (e.g. when its deadline elapses).
#[derive(Debug, Clone)]
pub struct CommandPinger {
    program: String,
    wait: Duration,
}

impl CommandPinger {
    pub fn new(program: impl Into<String>, wait: Duration) -> Self {
        Self {
            program: program.into(),
            wait,
        }
    }

    /// Echo wait in whole seconds as passed to `-W`, never less than one.
    fn wait_arg(&self) -> String {
        self.wait.as_secs().max(1).to_string()
    }
}

#[async_trait::async_trait]
impl Pinger for CommandPinger {
    async fn ping(&self, host: &str) -> Result<f64, ProbeError> {
        let wait = self.wait_arg();
        let output = Command::new(&self.program)
            .args(["-c", "1", "-W", wait.as_str(), host])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ProbeError::Unavailable(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(ProbeError::Unavailable(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ping_time(&stdout).ok_or_else(|| {
            let first_line = stdout.lines().next().unwrap_or_default();
            ProbeError::Unparsable(format!("no round-trip time in '{first_line}'"))
        })
    }
}
