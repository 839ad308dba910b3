//! Routes for the booking resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{
    Json, Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use marquee_booking::coordinator::PaymentResult;
use marquee_booking::engine::{CancelOutcome, SeatSelection};
use marquee_booking::queries::{self, BookingView};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct InitiateBookingRequest {
    /// The requesting user.
    pub user_id: Uuid,
    /// The show to book.
    pub show_id: Uuid,
    /// The seats to hold.
    pub seat_ids: Vec<Uuid>,
}

/// Response body for a created booking.
#[derive(Debug, Serialize)]
pub struct BookingCreatedResponse {
    /// The new PENDING booking.
    pub booking_id: Uuid,
    /// When the seat holds lapse.
    pub expires_at: DateTime<Utc>,
    /// Sum of the seat prices.
    pub total_amount: Decimal,
}

/// Request body for POST /{`booking_id`}/confirm.
#[derive(Debug, Deserialize)]
pub struct ConfirmBookingRequest {
    /// Gateway transaction reference from an externally processed
    /// payment.
    pub payment_ref: String,
}

/// Request body for POST /{`booking_id`}/cancel.
#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    /// The caller; must own the booking.
    pub user_id: Uuid,
}

/// Response body after a cancellation.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// The cancelled booking.
    pub booking_id: Uuid,
    /// Whether a refund was pushed through the gateway.
    pub refund_issued: bool,
}

/// Response body after a payment run.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// The booking paid for.
    pub booking_id: Uuid,
    /// `completed` or `declined`.
    pub result: &'static str,
    /// Gateway transaction reference on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,
    /// Decline reason, if declined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// POST /
#[instrument(skip(state, request), fields(user_id = %request.user_id, show_id = %request.show_id))]
async fn initiate_booking(
    State(state): State<AppState>,
    Json(request): Json<InitiateBookingRequest>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), ApiError> {
    let receipt = state
        .engine
        .initiate_booking(
            SeatSelection {
                user_id: request.user_id,
                show_id: request.show_id,
                seat_ids: request.seat_ids,
                lock_duration: None,
            },
            state.deadline(),
        )
        .await?;

    info!(booking_id = %receipt.booking_id, "booking created");
    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            booking_id: receipt.booking_id,
            expires_at: receipt.expires_at,
            total_amount: receipt.total_amount,
        }),
    ))
}

/// POST /{`booking_id`}/confirm
#[instrument(skip(state, request), fields(%booking_id))]
async fn confirm_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<ConfirmBookingRequest>,
) -> Result<Json<BookingView>, ApiError> {
    state
        .engine
        .confirm_booking(booking_id, &request.payment_ref, state.deadline())
        .await?;
    let view = queries::booking_view(state.bookings.as_ref(), booking_id).await?;
    Ok(Json(view))
}

/// POST /{`booking_id`}/pay
#[instrument(skip(state), fields(%booking_id))]
async fn pay_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let result = state.coordinator.process_payment(booking_id).await?;
    let response = match result {
        PaymentResult::Completed { payment_ref } => PaymentResponse {
            booking_id,
            result: "completed",
            payment_ref: Some(payment_ref),
            reason: None,
        },
        PaymentResult::Declined { reason } => PaymentResponse {
            booking_id,
            result: "declined",
            payment_ref: None,
            reason: Some(reason),
        },
    };
    Ok(Json(response))
}

/// POST /{`booking_id`}/cancel
#[instrument(skip(state, request), fields(%booking_id))]
async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<CancelResponse>, ApiError> {
    let outcome = state
        .engine
        .cancel_booking(booking_id, request.user_id, state.deadline())
        .await?;

    let refund_issued = match outcome {
        CancelOutcome::Released => false,
        CancelOutcome::RefundDue {
            payment_ref: Some(payment_ref),
            amount,
        } => {
            state
                .coordinator
                .issue_refund(booking_id, &payment_ref, amount)
                .await?;
            true
        }
        CancelOutcome::RefundDue {
            payment_ref: None, ..
        } => {
            warn!(%booking_id, "confirmed booking had no payment reference, skipping refund");
            false
        }
    };

    Ok(Json(CancelResponse {
        booking_id,
        refund_issued,
    }))
}

/// GET /{`booking_id`}
#[instrument(skip(state), fields(booking_id = %id))]
async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, ApiError> {
    let view = queries::booking_view(state.bookings.as_ref(), id).await?;
    Ok(Json(view))
}

/// Returns the router for the booking resource.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(initiate_booking))
        .route("/{booking_id}", get(get_booking))
        .route("/{booking_id}/confirm", post(confirm_booking))
        .route("/{booking_id}/pay", post(pay_booking))
        .route("/{booking_id}/cancel", post(cancel_booking))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use marquee_core::seat::SeatState;
    use uuid::Uuid;

    use super::router;
    use crate::routes::test_util::{get_json, post_json, test_app};

    #[tokio::test]
    async fn test_initiate_returns_201_with_receipt() {
        // Arrange
        let rig = test_app();
        let app = router().with_state(rig.state.clone());
        let user_id = Uuid::new_v4();
        let body = serde_json::json!({
            "user_id": user_id,
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0], rig.seat_ids[1]],
        });

        // Act
        let (status, json) = post_json(app, "/", &body).await;

        // Assert
        assert_eq!(status, StatusCode::CREATED);
        let booking_id = Uuid::parse_str(json["booking_id"].as_str().unwrap()).unwrap();
        assert_eq!(json["total_amount"], "200");
        assert!(json["expires_at"].is_string());

        let row = rig.seats.row(rig.seat_ids[0]).unwrap();
        assert!(matches!(row.state, SeatState::Locked { holder, .. } if holder == booking_id));
    }

    #[tokio::test]
    async fn test_initiate_conflict_lists_failed_seats() {
        // Arrange — first caller holds seat 0.
        let rig = test_app();
        let first = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0]],
        });
        let (status, _) = post_json(router().with_state(rig.state.clone()), "/", &first).await;
        assert_eq!(status, StatusCode::CREATED);

        // Act — second caller wants seats 0 and 2.
        let second = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0], rig.seat_ids[2]],
        });
        let (status, json) = post_json(router().with_state(rig.state.clone()), "/", &second).await;

        // Assert
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "seats_unavailable");
        let failed = json["failed_seat_ids"].as_array().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0], rig.seat_ids[0].to_string());
        // The free seat was not touched.
        assert_eq!(
            rig.seats.row(rig.seat_ids[2]).unwrap().state,
            SeatState::Available
        );
    }

    #[tokio::test]
    async fn test_confirm_returns_confirmed_view() {
        // Arrange
        let rig = test_app();
        let body = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0]],
        });
        let (_, created) = post_json(router().with_state(rig.state.clone()), "/", &body).await;
        let booking_id = created["booking_id"].as_str().unwrap().to_owned();

        // Act
        let (status, json) = post_json(
            router().with_state(rig.state.clone()),
            &format!("/{booking_id}/confirm"),
            &serde_json::json!({ "payment_ref": "tx_abc" }),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["payment_status"], "completed");
        assert_eq!(json["payment_ref"], "tx_abc");
    }

    #[tokio::test]
    async fn test_confirm_after_expiry_returns_410() {
        // Arrange
        let rig = test_app();
        let body = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0]],
        });
        let (_, created) = post_json(router().with_state(rig.state.clone()), "/", &body).await;
        let booking_id = created["booking_id"].as_str().unwrap().to_owned();
        rig.clock.advance(chrono::Duration::minutes(16));

        // Act
        let (status, json) = post_json(
            router().with_state(rig.state.clone()),
            &format!("/{booking_id}/confirm"),
            &serde_json::json!({ "payment_ref": "tx_late" }),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(json["error"], "booking_expired");
    }

    #[tokio::test]
    async fn test_pay_reports_completed_outcome() {
        // Arrange — the test gateway approves everything.
        let rig = test_app();
        let body = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0]],
        });
        let (_, created) = post_json(router().with_state(rig.state.clone()), "/", &body).await;
        let booking_id = created["booking_id"].as_str().unwrap().to_owned();

        // Act
        let (status, json) = post_json(
            router().with_state(rig.state.clone()),
            &format!("/{booking_id}/pay"),
            &serde_json::json!({}),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["result"], "completed");
        assert!(json["payment_ref"].is_string());
    }

    #[tokio::test]
    async fn test_cancel_pending_returns_200_without_refund() {
        // Arrange
        let rig = test_app();
        let user_id = Uuid::new_v4();
        let body = serde_json::json!({
            "user_id": user_id,
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0]],
        });
        let (_, created) = post_json(router().with_state(rig.state.clone()), "/", &body).await;
        let booking_id = created["booking_id"].as_str().unwrap().to_owned();

        // Act
        let (status, json) = post_json(
            router().with_state(rig.state.clone()),
            &format!("/{booking_id}/cancel"),
            &serde_json::json!({ "user_id": user_id }),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["refund_issued"], false);
        assert_eq!(
            rig.seats.row(rig.seat_ids[0]).unwrap().state,
            SeatState::Available
        );
    }

    #[tokio::test]
    async fn test_cancel_by_non_owner_returns_403() {
        let rig = test_app();
        let body = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "show_id": rig.show_id,
            "seat_ids": [rig.seat_ids[0]],
        });
        let (_, created) = post_json(router().with_state(rig.state.clone()), "/", &body).await;
        let booking_id = created["booking_id"].as_str().unwrap().to_owned();

        let (status, json) = post_json(
            router().with_state(rig.state.clone()),
            &format!("/{booking_id}/cancel"),
            &serde_json::json!({ "user_id": Uuid::new_v4() }),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_get_booking_returns_404_when_unknown() {
        let rig = test_app();

        let (status, json) = get_json(
            router().with_state(rig.state.clone()),
            &format!("/{}", Uuid::new_v4()),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "booking_not_found");
    }

    #[tokio::test]
    async fn test_initiate_returns_422_for_missing_body_fields() {
        use tower::ServiceExt;

        let rig = test_app();
        let app = router().with_state(rig.state.clone());
        let body = serde_json::json!({ "user_id": Uuid::new_v4() });

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        // Axum returns 422 for deserialization failures.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
