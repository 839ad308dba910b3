//! Show read model.
//!
//! Shows, screens, and movies live in an external catalog; the engine
//! only needs a show's schedule state and start time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BookingError;

/// Schedule state of a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowStatus {
    /// Announced and bookable.
    Scheduled,
    /// Currently screening.
    InProgress,
    /// Finished screening.
    Completed,
    /// Cancelled by the operator.
    Cancelled,
}

/// Read-only projection of a show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowInfo {
    /// Show identifier.
    pub id: Uuid,
    /// The movie being screened.
    pub movie_id: Uuid,
    /// The screen it plays on.
    pub screen_id: Uuid,
    /// Screening start.
    pub starts_at: DateTime<Utc>,
    /// Screening end.
    pub ends_at: DateTime<Utc>,
    /// Base ticket price; per-seat multipliers are baked into seat rows.
    pub base_price: Decimal,
    /// Schedule state.
    pub status: ShowStatus,
}

impl ShowInfo {
    /// Whether new bookings may be initiated at `now`.
    #[must_use]
    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.status == ShowStatus::Scheduled && self.starts_at > now
    }
}

/// Read-only show lookups.
#[async_trait]
pub trait ShowCatalog: Send + Sync {
    /// Fetches a show by ID, `None` when unknown.
    async fn show(&self, show_id: Uuid) -> Result<Option<ShowInfo>, BookingError>;
}
