//! `PostgreSQL` implementation of the `ShowCatalog` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use marquee_core::error::BookingError;
use marquee_core::show::{ShowCatalog, ShowInfo, ShowStatus};

/// PostgreSQL-backed show catalog.
#[derive(Debug, Clone)]
pub struct PgShowCatalog {
    pool: PgPool,
}

impl PgShowCatalog {
    /// Creates a new `PgShowCatalog`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a show row. Catalog writes are operational tooling, not
    /// part of the reservation path.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Store` on database failure.
    pub async fn insert(&self, show: &ShowInfo) -> Result<(), BookingError> {
        sqlx::query(
            "INSERT INTO shows (id, movie_id, screen_id, starts_at, ends_at, base_price, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(show.id)
        .bind(show.movie_id)
        .bind(show.screen_id)
        .bind(show.starts_at)
        .bind(show.ends_at)
        .bind(show.base_price)
        .bind(show_status_str(show.status))
        .execute(&self.pool)
        .await
        .map_err(|e| BookingError::Store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ShowCatalog for PgShowCatalog {
    async fn show(&self, show_id: Uuid) -> Result<Option<ShowInfo>, BookingError> {
        let record = sqlx::query_as::<_, ShowRecord>(
            "SELECT id, movie_id, screen_id, starts_at, ends_at, base_price, status
             FROM shows WHERE id = $1",
        )
        .bind(show_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::Store(e.to_string()))?;
        record.map(ShowRecord::into_info).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShowRecord {
    id: Uuid,
    movie_id: Uuid,
    screen_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    base_price: Decimal,
    status: String,
}

impl ShowRecord {
    fn into_info(self) -> Result<ShowInfo, BookingError> {
        let status = parse_show_status(&self.status).ok_or_else(|| {
            BookingError::Store(format!("corrupt show row {}: status={}", self.id, self.status))
        })?;
        Ok(ShowInfo {
            id: self.id,
            movie_id: self.movie_id,
            screen_id: self.screen_id,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            base_price: self.base_price,
            status,
        })
    }
}

fn show_status_str(status: ShowStatus) -> &'static str {
    match status {
        ShowStatus::Scheduled => "SCHEDULED",
        ShowStatus::InProgress => "IN_PROGRESS",
        ShowStatus::Completed => "COMPLETED",
        ShowStatus::Cancelled => "CANCELLED",
    }
}

fn parse_show_status(value: &str) -> Option<ShowStatus> {
    match value {
        "SCHEDULED" => Some(ShowStatus::Scheduled),
        "IN_PROGRESS" => Some(ShowStatus::InProgress),
        "COMPLETED" => Some(ShowStatus::Completed),
        "CANCELLED" => Some(ShowStatus::Cancelled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use marquee_core::show::ShowStatus;

    use super::{parse_show_status, show_status_str};

    #[test]
    fn test_show_status_round_trips() {
        let statuses = [
            ShowStatus::Scheduled,
            ShowStatus::InProgress,
            ShowStatus::Completed,
            ShowStatus::Cancelled,
        ];
        for status in statuses {
            assert_eq!(parse_show_status(show_status_str(status)), Some(status));
        }
        assert_eq!(parse_show_status("POSTPONED"), None);
    }
}
