//! Composition root: build the store, venue feeds and engine from config.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::memory::MemoryStore;
use crate::adapter::outbound::sqlite::SqliteStore;
use crate::adapter::outbound::venue::{KalshiFeed, PolymarketFeed};
use crate::application::ingestion::IngestionService;
use crate::application::Engine;
use crate::error::Result;
use crate::infrastructure::config::{Config, StoreBackend};
use crate::port::outbound::store::Store;

/// Open the configured store. SQLite migrations run on open.
///
/// # Errors
/// Returns an error if the database cannot be opened or migrated.
pub fn build_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.database.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            info!(path = %config.database.path, "Opening SQLite store");
            Ok(Arc::new(SqliteStore::open(&config.database.path)?))
        }
    }
}

/// Register a feed for each enabled venue.
pub fn build_ingestion(config: &Config, store: Arc<dyn Store>) -> IngestionService {
    let mut ingestion = IngestionService::new(store, config.matcher.duplicate_tolerance());

    let venues = &config.venues;
    if venues.polymarket.enabled {
        ingestion = ingestion.with_feed(
            Arc::new(PolymarketFeed::from_config(&venues.polymarket)),
            venues.polymarket.fees,
        );
    }
    if venues.kalshi.enabled {
        ingestion = ingestion.with_feed(
            Arc::new(KalshiFeed::from_config(&venues.kalshi)),
            venues.kalshi.fees,
        );
    }
    ingestion
}

/// Assemble an engine over an existing store.
pub fn build_engine_with_store(config: &Config, store: Arc<dyn Store>) -> Engine {
    let ingestion = build_ingestion(config, store.clone());
    Engine::new(
        store,
        config.matcher.clone(),
        config.arbitrage.clone(),
        ingestion,
    )
}

/// Assemble the full engine.
///
/// # Errors
/// Returns an error if the store cannot be opened.
pub fn build_engine(config: &Config) -> Result<Engine> {
    let store = build_store(config)?;
    let engine = build_engine_with_store(config, store);
    info!(venues = ?engine.ingestion.venue_ids(), "Engine ready");
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VenueId;

    fn memory_config() -> Config {
        toml::from_str("[database]\nbackend = \"memory\"\n").unwrap()
    }

    #[test]
    fn both_venues_registered_by_default() {
        let engine = build_engine(&memory_config()).unwrap();
        let ids = engine.ingestion.venue_ids();
        assert!(ids.contains(&VenueId::new("polymarket")));
        assert!(ids.contains(&VenueId::new("kalshi")));
    }

    #[test]
    fn disabled_venue_is_skipped() {
        let mut config = memory_config();
        config.venues.kalshi.enabled = false;
        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.ingestion.venue_ids(), vec![VenueId::new("polymarket")]);
    }
}
