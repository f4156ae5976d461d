//! Shutdown coordination.
//!
//! Turns SIGINT / SIGTERM into a cancellation token. The orchestrator only
//! gets a read-only [`ShutdownSignal`] and checks it between cycles, so a
//! cycle that is already running always finishes and records its sample.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owner of the process-wide shutdown state.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only handle for the orchestrator.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            token: self.token.clone(),
        }
    }

    /// Request shutdown. Repeated requests are logged and otherwise ignored.
    pub fn request(&self, reason: &str) {
        trigger(&self.token, reason);
    }

    /// Listen for termination signals in a background task.
    ///
    /// # Errors
    /// Returns an error if a signal handler cannot be registered.
    pub fn install(&self) -> std::io::Result<JoinHandle<()>> {
        let token = self.token.clone();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut interrupt = signal(SignalKind::interrupt())?;
            let mut terminate = signal(SignalKind::terminate())?;

            Ok(tokio::spawn(async move {
                loop {
                    let reason = tokio::select! {
                        Some(()) = interrupt.recv() => "SIGINT",
                        Some(()) = terminate.recv() => "SIGTERM",
                        else => break,
                    };
                    trigger(&token, reason);
                }
            }))
        }

        #[cfg(not(unix))]
        {
            Ok(tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    trigger(&token, "Ctrl+C");
                }
            }))
        }
    }
}

fn trigger(token: &CancellationToken, reason: &str) {
    if token.is_cancelled() {
        tracing::warn!(reason, "Shutdown already requested");
        return;
    }
    tracing::warn!(reason, "Received shutdown request, stopping after the current cycle");
    token.cancel();
}

/// Read-only view of the shutdown state.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_request_sets_flag() {
        let coordinator = ShutdownCoordinator::new();
        let signal = coordinator.signal();
        assert!(!signal.is_requested());

        coordinator.request("test");

        assert!(signal.is_requested());
    }

    #[test]
    fn test_request_is_idempotent() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.request("first");
        coordinator.request("second");
        assert!(coordinator.signal().is_requested());
    }

    #[test]
    fn test_clones_share_state() {
        let coordinator = ShutdownCoordinator::new();
        let signal = coordinator.signal();

        coordinator.clone().request("from clone");

        assert!(signal.is_requested());
    }

    #[tokio::test]
    async fn test_requested_resolves() {
        let coordinator = ShutdownCoordinator::new();
        let signal = coordinator.signal();

        let waiter = tokio::spawn(async move { signal.requested().await });
        coordinator.request("test");

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("signal should resolve")
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_registers_handlers() {
        let coordinator = ShutdownCoordinator::new();
        let handle = coordinator.install().unwrap();
        assert!(!coordinator.signal().is_requested());
        handle.abort();
    }
}
