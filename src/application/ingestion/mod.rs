//! Venue ingestion: markets, venue events and quotes into the store.

mod service;

pub use service::{IngestSummary, IngestionService, VenueReport};
