//! Outbound ports: what the application needs from the outside world.

pub mod store;
pub mod venue;

pub use store::{
    CandidateFilter, CandidateStore, EventFilter, EventStore, MarketFilter, MarketStore,
    OpportunityFilter, OpportunityStore, QuoteFilter, QuoteStore, Store, UpsertOutcome,
};
pub use venue::{VenueEvent, VenueFeed, VenueMarket, VenueQuote};
