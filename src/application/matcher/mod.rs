//! Event matching: map venue markets onto canonical sports events.

mod config;
pub mod scoring;
mod service;

pub use config::MatcherConfig;
pub use scoring::score_event;
pub use service::{MatcherService, SuggestSummary};
