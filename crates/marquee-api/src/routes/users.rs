//! Routes for per-user booking history and statistics.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use marquee_booking::queries::{self, BookingView, UserStats};

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for GET /{`user_id`}/bookings.
#[derive(Debug, Serialize)]
pub struct UserBookingsResponse {
    /// The user's bookings, newest first.
    pub bookings: Vec<BookingView>,
}

/// GET /{`user_id`}/bookings
#[instrument(skip(state), fields(%user_id))]
async fn user_bookings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserBookingsResponse>, ApiError> {
    let bookings = queries::user_bookings(state.bookings.as_ref(), user_id).await?;
    Ok(Json(UserBookingsResponse { bookings }))
}

/// GET /{`user_id`}/stats
#[instrument(skip(state), fields(%user_id))]
async fn user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserStats>, ApiError> {
    let stats = queries::user_stats(state.bookings.as_ref(), user_id).await?;
    Ok(Json(stats))
}

/// Returns the router for user projections.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}/bookings", get(user_bookings))
        .route("/{user_id}/stats", get(user_stats))
}
