use std::fmt;

use thiserror::Error;

use crate::domain::arbitrage::NoOpportunity;
use crate::domain::error::DomainError;

/// Stable, machine-readable error classification.
///
/// Every error that crosses the HTTP boundary carries one of these kinds so
/// that clients can branch on it without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidPriceFormat,
    DegeneratePrice,
    NotFound,
    InvalidState,
    AlreadyResolved,
    InvalidStatusTransition,
    InsufficientVenues,
    NoArbitrage,
    IncompleteGroup,
    BelowThreshold,
    ConflictingActiveOpportunity,
    UnknownVenue,
    InvalidInput,
    Config,
    Ingest,
    Database,
    Internal,
}

impl ErrorKind {
    /// The wire name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPriceFormat => "InvalidPriceFormat",
            Self::DegeneratePrice => "DegeneratePrice",
            Self::NotFound => "NotFound",
            Self::InvalidState => "InvalidState",
            Self::AlreadyResolved => "AlreadyResolved",
            Self::InvalidStatusTransition => "InvalidStatusTransition",
            Self::InsufficientVenues => "InsufficientVenues",
            Self::NoArbitrage => "NoArbitrage",
            Self::IncompleteGroup => "IncompleteGroup",
            Self::BelowThreshold => "BelowThreshold",
            Self::ConflictingActiveOpportunity => "ConflictingActiveOpportunity",
            Self::UnknownVenue => "UnknownVenue",
            Self::InvalidInput => "InvalidInput",
            Self::Config => "Config",
            Self::Ingest => "Ingest",
            Self::Database => "Database",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Venue ingestion errors.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("venue '{venue}' is not configured")]
    UnknownVenue { venue: String },

    #[error("venue '{venue}' returned an unexpected payload: {reason}")]
    UnexpectedPayload { venue: String, reason: String },

    #[error("{failed} of {total} venues failed to ingest")]
    PartialFailure { failed: usize, total: usize },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Solver(#[from] NoOpportunity),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl Error {
    /// Classify this error for external reporting.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Domain(err) => err.kind(),
            Self::Solver(reason) => reason.kind(),
            Self::Ingest(IngestError::UnknownVenue { .. }) => ErrorKind::UnknownVenue,
            Self::Ingest(_) | Self::Http(_) | Self::Url(_) => ErrorKind::Ingest,
            Self::Connection(_) | Self::Database(_) => ErrorKind::Database,
            Self::Json(_) | Self::Io(_) | Self::Parse(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::CandidateId;

    #[test]
    fn domain_errors_keep_their_kind() {
        let err: Error = DomainError::NotFound {
            entity: "mapping candidate",
            id: CandidateId::new(7).to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.kind().as_str(), "NotFound");
    }

    #[test]
    fn unknown_venue_is_classified() {
        let err: Error = IngestError::UnknownVenue {
            venue: "betfair".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::UnknownVenue);
        assert_eq!(err.to_string(), "venue 'betfair' is not configured");
    }

    #[test]
    fn storage_failures_are_database_kind() {
        assert_eq!(Error::Database("locked".into()).kind(), ErrorKind::Database);
        assert_eq!(
            Error::Connection("pool exhausted".into()).kind(),
            ErrorKind::Database
        );
    }
}
