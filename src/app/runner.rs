use std::future::Future;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use super::error::AppError;
use super::shutdown::ShutdownCoordinator;

/// Reusable service runner that handles:
/// - tracing subscriber setup (`RUST_LOG`, default `info`)
/// - SIGTERM / SIGINT wiring through a [`ShutdownCoordinator`]
/// - Exit codes (0 = success or graceful shutdown, 1 = error)
pub struct ServiceApp {
    name: String,
}

impl ServiceApp {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `main_fn` with an installed shutdown coordinator and return the
    /// process exit code
    pub async fn run<F, Fut>(self, main_fn: F) -> i32
    where
        F: FnOnce(ShutdownCoordinator) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        init_tracing();

        let coordinator = ShutdownCoordinator::new();
        let signals = match coordinator.install() {
            Ok(handle) => handle,
            Err(e) => {
                error!(service = %self.name, error = %e, "Failed to install signal handlers");
                return 1;
            }
        };

        info!(service = %self.name, "Starting");
        let result = main_fn(coordinator.clone()).await;
        signals.abort();

        match result {
            Ok(()) => {
                info!(
                    service = %self.name,
                    interrupted = !coordinator.is_running(),
                    "Stopped"
                );
                0
            }
            Err(e) => {
                error!(service = %self.name, error = %e, "Fatal error");
                1
            }
        }
    }
}

/// Install the global fmt subscriber; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error::ConfigError;

    #[test]
    fn service_app_new() {
        let app = ServiceApp::new("ingest");
        assert_eq!(app.name(), "ingest");
    }

    #[tokio::test]
    async fn success_exits_zero() {
        let code = ServiceApp::new("ingest").run(|_| async { Ok(()) }).await;
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn error_exits_one() {
        let code = ServiceApp::new("ingest")
            .run(|_| async { Err(AppError::from(ConfigError::Missing("K_SINK"))) })
            .await;
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn main_fn_sees_live_coordinator() {
        let code = ServiceApp::new("ingest")
            .run(|shutdown| async move {
                assert!(shutdown.is_running());
                shutdown.trigger();
                assert!(shutdown.token().is_cancelled());
                Ok(())
            })
            .await;
        assert_eq!(code, 0);
    }
}
