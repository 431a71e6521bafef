//! The assembled set of services shared by the HTTP and CLI surfaces.

use std::sync::Arc;

use super::arbitrage::{ArbitrageConfig, ScanService};
use super::event::EventService;
use super::ingestion::IngestionService;
use super::matcher::{MatcherConfig, MatcherService};
use crate::port::outbound::store::Store;

/// Services over one store. Cloning shares them.
#[derive(Clone)]
pub struct Engine {
    pub store: Arc<dyn Store>,
    pub events: Arc<EventService>,
    pub matcher: Arc<MatcherService>,
    pub scanner: Arc<ScanService>,
    pub ingestion: Arc<IngestionService>,
}

impl Engine {
    /// Wire services over `store`. Venue feeds are registered on
    /// `ingestion` by the caller.
    pub fn new(
        store: Arc<dyn Store>,
        matcher: MatcherConfig,
        arbitrage: ArbitrageConfig,
        ingestion: IngestionService,
    ) -> Self {
        let tolerance = matcher.duplicate_tolerance();
        Self {
            events: Arc::new(EventService::new(store.clone(), tolerance)),
            matcher: Arc::new(MatcherService::new(matcher, store.clone())),
            scanner: Arc::new(ScanService::new(arbitrage, store.clone())),
            ingestion: Arc::new(ingestion),
            store,
        }
    }
}
