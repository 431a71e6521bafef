//! Venue-agnostic domain logic. No I/O, no async runtime.

pub mod arbitrage;
pub mod error;
pub mod id;
pub mod mapping;
pub mod market;
pub mod opportunity;
pub mod parser;
pub mod price;
pub mod quote;
pub mod similarity;
pub mod sports_event;

pub use arbitrage::{detect, select_best_legs, solve, Allocation, LegQuote, NoOpportunity, SolverConfig};
pub use error::DomainError;
pub use id::{CandidateId, MarketId, OpportunityId, QuoteId, SportsEventId, VenueId};
pub use mapping::{
    CandidateStatus, FeatureSet, MappingCandidate, MatchFeature, NewMappingCandidate,
    ScoringWeights,
};
pub use market::{
    Market, MarketStatus, MarketType, NewMarket, OutcomeGroup, OutcomeLabel, ParsedHints,
};
pub use opportunity::{
    ArbLeg, GroupKey, LegFingerprint, NewOpportunity, Opportunity, OpportunityBuildError,
    OpportunityStatus,
};
pub use price::{normalize, normalize_with_fees, FeeModel, NormalizedPrice, Price, PriceFormat};
pub use quote::{select_current, NewQuote, Quote, QuoteSelectionPolicy};
pub use sports_event::{EventSource, EventStatus, NewSportsEvent, SportsEvent};
