//! Health check endpoint.
//!
//! Liveness is judged through the booking store: a probe read of a nil
//! booking ID reaches the database on a real deployment without
//! touching any data, so a dead pool turns the check degraded instead
//! of lying with a static body.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store probe fails.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Booking store reachability.
    pub store: &'static str,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let probe = state.bookings.booking(Uuid::nil()).await;
    let (code, status, store) = match probe {
        Ok(_) => (StatusCode::OK, "ok", "reachable"),
        Err(error) => {
            warn!(%error, "health probe failed against the booking store");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
        }
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            store,
        }),
    )
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use marquee_test_support::FailingBookingStore;

    use super::router;
    use crate::routes::test_util::{get_json, test_app};
    use crate::state::AppState;

    #[tokio::test]
    async fn test_health_reports_ok_when_store_answers() {
        let rig = test_app();

        let (status, json) = get_json(router().with_state(rig.state.clone()), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["store"], "reachable");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_health_reports_degraded_when_store_is_down() {
        // Same wiring, but the probe store refuses every call.
        let rig = test_app();
        let state = AppState::new(
            rig.state.engine.clone(),
            rig.state.coordinator.clone(),
            rig.state.seats.clone(),
            Arc::new(FailingBookingStore),
            rig.state.clock.clone(),
            None,
        );

        let (status, json) = get_json(router().with_state(state), "/health").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["store"], "unreachable");
    }
}
