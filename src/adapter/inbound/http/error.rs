//! Mapping of crate errors onto HTTP responses.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

use crate::domain::DomainError;
use crate::error::{Error, ErrorKind};

/// Error body: `{"error": {"kind": ..., "message": ...}}`.
#[derive(Debug)]
pub enum ApiError {
    Engine(Error),
    BadRequest(String),
}

impl ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Engine(err) => err.kind(),
            Self::BadRequest(_) => ErrorKind::InvalidInput,
        }
    }
}

/// HTTP status for an error kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound | ErrorKind::UnknownVenue => StatusCode::NOT_FOUND,
        ErrorKind::InvalidState
        | ErrorKind::AlreadyResolved
        | ErrorKind::InvalidStatusTransition
        | ErrorKind::ConflictingActiveOpportunity => StatusCode::CONFLICT,
        ErrorKind::InvalidPriceFormat
        | ErrorKind::DegeneratePrice
        | ErrorKind::InsufficientVenues
        | ErrorKind::NoArbitrage
        | ErrorKind::IncompleteGroup
        | ErrorKind::BelowThreshold
        | ErrorKind::InvalidInput
        | ErrorKind::Config => StatusCode::BAD_REQUEST,
        ErrorKind::Ingest | ErrorKind::Database | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Engine(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Engine(err.into())
    }
}

impl ApiError {
    pub(crate) fn from_query(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }

    pub(crate) fn from_json(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }

    pub(crate) fn from_path(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Body of an endpoint whose JSON payload may be left out. A request without
/// a JSON content type gets the default; a JSON body that does not parse
/// into `T` is a bad request.
pub(crate) fn optional_json<T: Default>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(ApiError::from_json(rejection)),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        let message = match &self {
            Self::Engine(err) => err.to_string(),
            Self::BadRequest(msg) => msg.clone(),
        };
        if status.is_server_error() {
            error!(kind = %kind, error = %message, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "kind": kind.as_str(),
                "message": message,
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::AlreadyResolved), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::DegeneratePrice), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(ErrorKind::Database),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_error_becomes_conflict() {
        let err: ApiError = DomainError::AlreadyResolved {
            market_id: 1,
            sports_event_id: 2,
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
