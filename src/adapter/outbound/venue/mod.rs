//! Venue REST feeds.

mod client;
pub mod kalshi;
pub mod polymarket;
pub mod settings;

pub use kalshi::KalshiFeed;
pub use polymarket::PolymarketFeed;
pub use settings::{HttpConfig, KalshiConfig, PolymarketConfig, VenuesConfig};
