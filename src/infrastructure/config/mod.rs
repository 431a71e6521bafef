//! Configuration loading.

pub mod logging;
pub mod settings;

pub use logging::LoggingConfig;
pub use settings::{Config, DatabaseConfig, ServerConfig, StoreBackend};
