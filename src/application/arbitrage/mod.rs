//! Cross-venue arbitrage scanning over stored quotes.

mod config;
mod service;

pub use config::ArbitrageConfig;
pub use service::{ScanService, ScanSummary};
