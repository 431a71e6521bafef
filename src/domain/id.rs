//! Domain identifier types.
//!
//! Row identifiers are store-assigned integers wrapped in newtypes so that a
//! market id can never be passed where an event id is expected. Venue ids are
//! short stable strings (`"polymarket"`, `"kalshi"`).

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

row_id!(
    /// Canonical sports event identifier.
    SportsEventId
);
row_id!(
    /// Venue market identifier (store row, not the venue's own key).
    MarketId
);
row_id!(
    /// Mapping candidate identifier.
    CandidateId
);
row_id!(
    /// Quote observation identifier. Monotonic in insertion order.
    QuoteId
);
row_id!(
    /// Arbitrage opportunity identifier.
    OpportunityId
);

/// Venue identifier - newtype for type safety.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(String);

impl VenueId {
    /// Create a new `VenueId`. Venue ids are case-insensitive and stored lowercase.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_ascii_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VenueId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for VenueId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_ids_serialize_as_plain_integers() {
        let id = OpportunityId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: OpportunityId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn venue_id_is_normalized() {
        assert_eq!(VenueId::new(" Kalshi ").as_str(), "kalshi");
        assert_eq!(VenueId::from("kalshi"), VenueId::new("KALSHI"));
    }

    #[test]
    fn quote_ids_order_by_value() {
        assert!(QuoteId::new(3) > QuoteId::new(2));
    }
}
