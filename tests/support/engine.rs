use std::sync::Arc;

use linesman::application::Engine;
use linesman::infrastructure::bootstrap::build_engine_with_store;
use linesman::infrastructure::config::Config;
use linesman::port::outbound::store::Store;

/// Default configuration with network venues switched off and exact share
/// amounts.
pub fn offline_config() -> Config {
    toml::from_str(
        r#"
        [database]
        backend = "memory"

        [arbitrage]
        share_lot = "0"

        [venues.polymarket]
        enabled = false

        [venues.kalshi]
        enabled = false
        "#,
    )
    .expect("parse offline config")
}

pub fn offline_engine(store: Arc<dyn Store>) -> Engine {
    build_engine_with_store(&offline_config(), store)
}
