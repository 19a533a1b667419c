pub mod config;
pub mod error;
pub mod runner;
pub mod shutdown;

// Re-export commonly used types
pub use config::IngestConfig;
pub use error::{AppError, ConfigError};
pub use runner::{ServiceApp, init_tracing};
pub use shutdown::ShutdownCoordinator;
