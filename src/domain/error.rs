//! Domain errors for rule violations.
//!
//! These are returned when an input breaks a domain invariant (a price outside
//! its format's range) or when a requested state change is not allowed (a
//! candidate that is no longer pending). Each variant maps to a stable
//! [`ErrorKind`] used at the HTTP boundary.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// A price is outside the valid range for its declared format.
    #[error("invalid {format} price {value}: {reason}")]
    InvalidPriceFormat {
        format: &'static str,
        value: String,
        reason: &'static str,
    },

    /// A price that reduces to a certain outcome (share price 0 or 1).
    #[error("degenerate price {share_price}: share price must be strictly between 0 and 1")]
    DegeneratePrice { share_price: Decimal },

    /// The referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The entity exists but is not in a state that permits the operation.
    #[error("{entity} {id} is {actual}, expected {expected}")]
    InvalidState {
        entity: &'static str,
        id: String,
        actual: &'static str,
        expected: &'static str,
    },

    /// The market was already linked to a different sports event.
    #[error("market {market_id} is already mapped to sports event {sports_event_id}")]
    AlreadyResolved {
        market_id: i64,
        sports_event_id: i64,
    },

    /// Event status transitions are monotonic.
    #[error("cannot move sports event {id} from {from} to {to}")]
    InvalidStatusTransition {
        id: i64,
        from: &'static str,
        to: &'static str,
    },

    /// More than one active opportunity exists for a single outcome group.
    #[error("multiple active opportunities for {group}")]
    ConflictingActiveOpportunity { group: String },

    /// The named venue has no configured feed.
    #[error("unknown venue '{venue}'")]
    UnknownVenue { venue: String },

    /// An unrecognised enum value arrived from a caller or the store.
    #[error("invalid {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

impl DomainError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPriceFormat { .. } => ErrorKind::InvalidPriceFormat,
            Self::DegeneratePrice { .. } => ErrorKind::DegeneratePrice,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::InvalidValue { .. } => ErrorKind::InvalidInput,
            Self::AlreadyResolved { .. } => ErrorKind::AlreadyResolved,
            Self::InvalidStatusTransition { .. } => ErrorKind::InvalidStatusTransition,
            Self::ConflictingActiveOpportunity { .. } => ErrorKind::ConflictingActiveOpportunity,
            Self::UnknownVenue { .. } => ErrorKind::UnknownVenue,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
