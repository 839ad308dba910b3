//! HTTP error mapping for the booking API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use marquee_core::error::BookingError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failure at startup.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// The offending seats, present only for seat-availability failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_seat_ids: Option<Vec<Uuid>>,
}

/// HTTP-layer wrapper around `BookingError` that implements
/// `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub BookingError);

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            BookingError::ShowNotFound(_) => (StatusCode::NOT_FOUND, "show_not_found"),
            BookingError::BookingNotFound(_) => (StatusCode::NOT_FOUND, "booking_not_found"),
            BookingError::SeatsNotFound { .. } => (StatusCode::NOT_FOUND, "seats_not_found"),
            BookingError::SeatsUnavailable { .. } => (StatusCode::CONFLICT, "seats_unavailable"),
            BookingError::Conflict => (StatusCode::CONFLICT, "conflict"),
            BookingError::AlreadyConfirmed(_) => (StatusCode::CONFLICT, "already_confirmed"),
            BookingError::Terminal { .. } => (StatusCode::CONFLICT, "terminal_state"),
            BookingError::Expired(_) => (StatusCode::GONE, "booking_expired"),
            BookingError::NotCancellable { .. } => (StatusCode::CONFLICT, "not_cancellable"),
            BookingError::Unauthorized { .. } => (StatusCode::FORBIDDEN, "unauthorized"),
            BookingError::Timeout => (StatusCode::REQUEST_TIMEOUT, "timeout"),
            BookingError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            BookingError::InvariantViolated(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invariant_violated")
            }
            BookingError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        };

        let failed_seat_ids = match &self.0 {
            BookingError::SeatsUnavailable { failed_seat_ids } => Some(failed_seat_ids.clone()),
            _ => None,
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
            failed_seat_ids,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use marquee_core::booking::BookingStatus;
    use uuid::Uuid;

    fn status_of(err: BookingError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_not_found_maps_to_404() {
        assert_eq!(
            status_of(BookingError::BookingNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(BookingError::ShowNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_availability_failures_map_to_409() {
        assert_eq!(
            status_of(BookingError::SeatsUnavailable {
                failed_seat_ids: vec![Uuid::new_v4()],
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(BookingError::Conflict), StatusCode::CONFLICT);
        assert_eq!(
            status_of(BookingError::Terminal {
                booking_id: Uuid::new_v4(),
                status: BookingStatus::Cancelled,
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_expired_maps_to_410() {
        assert_eq!(
            status_of(BookingError::Expired(Uuid::new_v4())),
            StatusCode::GONE
        );
    }

    #[test]
    fn test_unauthorized_maps_to_403() {
        assert_eq!(
            status_of(BookingError::Unauthorized {
                booking_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
            }),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_timeout_maps_to_408() {
        assert_eq!(status_of(BookingError::Timeout), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_fatal_errors_map_to_500() {
        assert_eq!(
            status_of(BookingError::InvariantViolated("seat mismatch".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(BookingError::Store("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
