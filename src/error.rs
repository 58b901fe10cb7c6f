//! Service error taxonomy and HTTP mapping.
//!
//! Every failure a handler can surface is one of these variants, each with a
//! stable wire kind. The JSON error body is always `{ "message": "<kind>" }`;
//! internal detail stays in the log, never in the response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for the reservation core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════
    // Request shape (400)
    // ═══════════════════════════════════════════════════════════
    /// Body or parameters failed to parse or validate.
    #[error("malformed request")]
    MalformedRequest,

    /// OTHER misconduct reports require comments.
    #[error("comments required")]
    CommentsRequired,

    /// Latitude or longitude out of range.
    #[error("invalid coordinate")]
    InvalidCoordinate,

    /// Boarding token was minted for a different trip.
    #[error("token is for a different trip")]
    WrongTrip,

    /// Token failed signature, format, or kind checks.
    #[error("invalid token")]
    InvalidToken,

    /// Email domain is not accepted at federated login.
    #[error("email domain not allowed")]
    DomainNotAllowed,

    // ═══════════════════════════════════════════════════════════
    // Authentication (401)
    // ═══════════════════════════════════════════════════════════
    /// No bearer token on a protected endpoint.
    #[error("missing credentials")]
    MissingCredentials,

    /// Token is past its expiry.
    #[error("expired token")]
    ExpiredToken,

    /// Unknown account or wrong password; deliberately indistinguishable.
    #[error("bad credentials")]
    BadCredentials,

    // ═══════════════════════════════════════════════════════════
    // Authorization (403)
    // ═══════════════════════════════════════════════════════════
    /// Passenger is blocked by the penalty subsystem.
    #[error("passenger blocked")]
    Blocked,

    /// Operator account is inactive or suspended.
    #[error("account suspended")]
    AccountSuspended,

    /// Caller does not own the resource.
    #[error("forbidden")]
    Forbidden,

    // ═══════════════════════════════════════════════════════════
    // Missing resources (404)
    // ═══════════════════════════════════════════════════════════
    /// Trip, booking, or passenger does not exist.
    #[error("not found")]
    NotFound,

    // ═══════════════════════════════════════════════════════════
    // Conflicts (409)
    // ═══════════════════════════════════════════════════════════
    /// Another writer holds the per-trip lease; retriable.
    #[error("concurrent request")]
    ConcurrentRequest,

    /// Another scan of this booking is in flight; retriable.
    #[error("concurrent scan")]
    ConcurrentScan,

    /// Passenger already holds a live booking for this trip.
    #[error("duplicate booking for trip")]
    DuplicateForTrip,

    /// Passenger already holds a live booking in this direction.
    #[error("duplicate booking for direction")]
    DuplicateForDirection,

    /// Trip already has an in-progress assignment.
    #[error("trip already active")]
    TripAlreadyActive,

    /// Booking exists but is not in a scannable state (waitlisted or
    /// cancelled).
    #[error("booking not eligible for boarding")]
    NotEligible,

    // ═══════════════════════════════════════════════════════════
    // Gone (410)
    // ═══════════════════════════════════════════════════════════
    /// Trip is cancelled or its departure is in the past.
    #[error("trip unavailable")]
    TripUnavailable,

    // ═══════════════════════════════════════════════════════════
    // Infrastructure (5xx)
    // ═══════════════════════════════════════════════════════════
    /// Unclassified internal failure; detail goes to the log only.
    #[error("internal error")]
    Internal(#[source] anyhow::Error),

    /// Telemetry topic rejected or timed out a publish; retriable.
    #[error("telemetry unavailable")]
    TelemetryUnavailable,

    /// Identity or coordination store unreachable.
    #[error("store unavailable")]
    StoreUnavailable,
}

impl Error {
    /// Stable wire kind placed in the error body.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::CommentsRequired => "COMMENTS_REQUIRED",
            Self::InvalidCoordinate => "INVALID_COORDINATE",
            Self::WrongTrip => "WRONG_TRIP",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::DomainNotAllowed => "DOMAIN_NOT_ALLOWED",
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::BadCredentials => "BAD_CREDENTIALS",
            Self::Blocked => "BLOCKED",
            Self::AccountSuspended => "ACCOUNT_SUSPENDED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::ConcurrentRequest => "CONCURRENT_REQUEST",
            Self::ConcurrentScan => "CONCURRENT_SCAN",
            Self::DuplicateForTrip => "DUPLICATE_FOR_TRIP",
            Self::DuplicateForDirection => "DUPLICATE_FOR_DIRECTION",
            Self::TripAlreadyActive => "TRIP_ALREADY_ACTIVE",
            Self::NotEligible => "NOT_ELIGIBLE",
            Self::TripUnavailable => "TRIP_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
            Self::TelemetryUnavailable => "TELEMETRY_UNAVAILABLE",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }

    /// HTTP status code for this failure.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest
            | Self::CommentsRequired
            | Self::InvalidCoordinate
            | Self::WrongTrip
            | Self::InvalidToken
            | Self::DomainNotAllowed => StatusCode::BAD_REQUEST,
            Self::MissingCredentials | Self::ExpiredToken | Self::BadCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::Blocked | Self::AccountSuspended | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ConcurrentRequest
            | Self::ConcurrentScan
            | Self::DuplicateForTrip
            | Self::DuplicateForDirection
            | Self::TripAlreadyActive
            | Self::NotEligible => StatusCode::CONFLICT,
            Self::TripUnavailable => StatusCode::GONE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TelemetryUnavailable | Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Wrap an arbitrary failure as `INTERNAL`.
    #[must_use]
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Stable failure kind.
    message: &'static str,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            if let Self::Internal(source) = &self {
                tracing::error!(kind = self.kind(), error = %source, "request failed");
            } else {
                tracing::error!(kind = self.kind(), "request failed");
            }
        }

        (status, Json(ErrorBody { message: self.kind() })).into_response()
    }
}

/// SQLSTATE codes that are safe to retry: serialization failure and
/// deadlock detected.
fn is_serialization_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "40001" || code == "40P01")
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if is_serialization_conflict(&err) {
            return Self::ConcurrentRequest;
        }
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                tracing::error!(error = %err, "identity store unavailable");
                Self::StoreUnavailable
            }
            other => Self::Internal(other.into()),
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        tracing::error!(error = %err, "coordination store unavailable");
        Self::StoreUnavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_spec_statuses() {
        let cases = [
            (Error::MalformedRequest, StatusCode::BAD_REQUEST),
            (Error::CommentsRequired, StatusCode::BAD_REQUEST),
            (Error::InvalidCoordinate, StatusCode::BAD_REQUEST),
            (Error::WrongTrip, StatusCode::BAD_REQUEST),
            (Error::InvalidToken, StatusCode::BAD_REQUEST),
            (Error::DomainNotAllowed, StatusCode::BAD_REQUEST),
            (Error::MissingCredentials, StatusCode::UNAUTHORIZED),
            (Error::ExpiredToken, StatusCode::UNAUTHORIZED),
            (Error::BadCredentials, StatusCode::UNAUTHORIZED),
            (Error::Blocked, StatusCode::FORBIDDEN),
            (Error::AccountSuspended, StatusCode::FORBIDDEN),
            (Error::Forbidden, StatusCode::FORBIDDEN),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::ConcurrentRequest, StatusCode::CONFLICT),
            (Error::ConcurrentScan, StatusCode::CONFLICT),
            (Error::DuplicateForTrip, StatusCode::CONFLICT),
            (Error::DuplicateForDirection, StatusCode::CONFLICT),
            (Error::TripAlreadyActive, StatusCode::CONFLICT),
            (Error::NotEligible, StatusCode::CONFLICT),
            (Error::TripUnavailable, StatusCode::GONE),
            (Error::TelemetryUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (Error::StoreUnavailable, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{}", err.kind());
        }
        assert_eq!(
            Error::internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_never_reaches_the_kind() {
        let err = Error::internal(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.kind(), "INTERNAL");
    }
}
