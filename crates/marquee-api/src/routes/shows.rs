//! Routes for show-level seat projections.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use marquee_booking::queries::{self, OccupancySummary, SeatView};

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for GET /{`show_id`}/seats.
#[derive(Debug, Serialize)]
pub struct SeatsResponse {
    /// Seats whose effective status is available.
    pub seats: Vec<SeatView>,
}

/// Response body for GET /{`show_id`}/revenue.
#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    /// Sum of confirmed booking totals.
    pub revenue: Decimal,
}

/// GET /{`show_id`}/seats
#[instrument(skip(state), fields(%show_id))]
async fn available_seats(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
) -> Result<Json<SeatsResponse>, ApiError> {
    let seats =
        queries::available_seats(state.seats.as_ref(), state.clock.as_ref(), show_id).await?;
    Ok(Json(SeatsResponse { seats }))
}

/// GET /{`show_id`}/occupancy
#[instrument(skip(state), fields(%show_id))]
async fn show_occupancy(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
) -> Result<Json<OccupancySummary>, ApiError> {
    let summary =
        queries::show_occupancy(state.seats.as_ref(), state.clock.as_ref(), show_id).await?;
    Ok(Json(summary))
}

/// GET /{`show_id`}/revenue
#[instrument(skip(state), fields(%show_id))]
async fn show_revenue(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
) -> Result<Json<RevenueResponse>, ApiError> {
    let revenue = queries::show_revenue(state.bookings.as_ref(), show_id).await?;
    Ok(Json(RevenueResponse { revenue }))
}

/// Returns the router for show projections.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{show_id}/seats", get(available_seats))
        .route("/{show_id}/occupancy", get(show_occupancy))
        .route("/{show_id}/revenue", get(show_revenue))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use uuid::Uuid;

    use super::router;
    use crate::routes::test_util::{get_json, post_json, test_app};

    #[tokio::test]
    async fn test_seats_lists_available_and_hides_held() {
        // Arrange — hold one of the three seats.
        let rig = test_app();
        let body = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0]],
        });
        let (status, _) = post_json(
            crate::routes::bookings::router().with_state(rig.state.clone()),
            "/",
            &body,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        // Act
        let (status, json) = get_json(
            router().with_state(rig.state.clone()),
            &format!("/{}/seats", rig.show_id),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        let seats = json["seats"].as_array().unwrap();
        assert_eq!(seats.len(), 2);
        for seat in seats {
            assert_ne!(seat["seat_id"], rig.seat_ids[0].to_string());
        }
    }

    #[tokio::test]
    async fn test_seats_reports_lapsed_holds_as_available() {
        // Arrange — hold a seat, then let it lapse.
        let rig = test_app();
        let body = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0]],
        });
        post_json(
            crate::routes::bookings::router().with_state(rig.state.clone()),
            "/",
            &body,
        )
        .await;
        rig.clock.advance(chrono::Duration::minutes(16));

        // Act
        let (_, json) = get_json(
            router().with_state(rig.state.clone()),
            &format!("/{}/seats", rig.show_id),
        )
        .await;

        // Assert — the lapsed hold is reported available again.
        assert_eq!(json["seats"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_occupancy_counts_per_status() {
        let rig = test_app();
        let body = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0]],
        });
        post_json(
            crate::routes::bookings::router().with_state(rig.state.clone()),
            "/",
            &body,
        )
        .await;

        let (status, json) = get_json(
            router().with_state(rig.state.clone()),
            &format!("/{}/occupancy", rig.show_id),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 3);
        assert_eq!(json["available"], 2);
        assert_eq!(json["locked"], 1);
        assert_eq!(json["booked"], 0);
    }

    #[tokio::test]
    async fn test_revenue_sums_confirmed_bookings() {
        // Arrange — confirm a two-seat booking.
        let rig = test_app();
        let bookings_app = crate::routes::bookings::router().with_state(rig.state.clone());
        let body = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0], rig.seat_ids[1]],
        });
        let (_, created) = post_json(bookings_app, "/", &body).await;
        let booking_id = created["booking_id"].as_str().unwrap().to_owned();
        post_json(
            crate::routes::bookings::router().with_state(rig.state.clone()),
            &format!("/{booking_id}/confirm"),
            &serde_json::json!({ "payment_ref": "tx_rev" }),
        )
        .await;

        // Act
        let (status, json) = get_json(
            router().with_state(rig.state.clone()),
            &format!("/{}/revenue", rig.show_id),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["revenue"], "200");
    }
}
