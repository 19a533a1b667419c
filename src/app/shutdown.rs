use std::io;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Process-wide "keep running" flag, flipped once by SIGTERM or SIGINT
///
/// Components never read global state; each one receives a child token.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child token to hand to a component
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Request shutdown without a signal
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Register the signal handlers and spawn the task that waits on them
    ///
    /// Handler registration happens before this returns, so a signal
    /// delivered afterwards is never lost.
    pub fn install(&self) -> io::Result<JoinHandle<()>> {
        let token = self.token.clone();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;

            Ok(tokio::spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => info!(signal = "SIGTERM", "Shutdown requested"),
                    _ = sigint.recv() => info!(signal = "SIGINT", "Shutdown requested"),
                    _ = token.cancelled() => return,
                }
                token.cancel();
            }))
        }

        #[cfg(not(unix))]
        {
            Ok(tokio::spawn(async move {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if result.is_ok() {
                            info!(signal = "Ctrl+C", "Shutdown requested");
                        }
                    }
                    _ = token.cancelled() => return,
                }
                token.cancel();
            }))
        }
    }
}
