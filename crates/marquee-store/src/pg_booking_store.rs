//! `PostgreSQL` implementation of the `BookingStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use marquee_core::booking::{BookingRow, BookingStatus, PaymentStatus};
use marquee_core::error::BookingError;
use marquee_core::store::BookingStore;

const BOOKING_COLUMNS: &str = "id, user_id, show_id, seat_ids, total_amount, status, \
                               payment_status, payment_ref, created_at, expires_at, updated_at";

/// PostgreSQL-backed booking store.
#[derive(Debug, Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    /// Creates a new `PgBookingStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, row: BookingRow) -> Result<(), BookingError> {
        sqlx::query(
            "INSERT INTO bookings (id, user_id, show_id, seat_ids, total_amount, status,
                                   payment_status, payment_ref, created_at, expires_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.show_id)
        .bind(row.seat_ids)
        .bind(row.total_amount)
        .bind(booking_status_str(row.status))
        .bind(payment_status_str(row.payment_status))
        .bind(row.payment_ref)
        .bind(row.created_at)
        .bind(row.expires_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn booking(&self, booking_id: Uuid) -> Result<Option<BookingRow>, BookingError> {
        let record = sqlx::query_as::<_, BookingRecord>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        record.map(BookingRecord::into_row).transpose()
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<BookingRow>, BookingError> {
        let records = sqlx::query_as::<_, BookingRecord>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE user_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        records.into_iter().map(BookingRecord::into_row).collect()
    }

    async fn bookings_for_show(&self, show_id: Uuid) -> Result<Vec<BookingRow>, BookingError> {
        let records = sqlx::query_as::<_, BookingRecord>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE show_id = $1"
        ))
        .bind(show_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        records.into_iter().map(BookingRecord::into_row).collect()
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        new: BookingStatus,
        payment_status: Option<PaymentStatus>,
        payment_ref: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        let result = sqlx::query(
            "UPDATE bookings
             SET status = $3,
                 payment_status = COALESCE($4, payment_status),
                 payment_ref = COALESCE($5, payment_ref),
                 updated_at = $6
             WHERE id = $1 AND status = $2",
        )
        .bind(booking_id)
        .bind(booking_status_str(expected))
        .bind(booking_status_str(new))
        .bind(payment_status.map(payment_status_str))
        .bind(payment_ref)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_payment(
        &self,
        booking_id: Uuid,
        payment_status: PaymentStatus,
        payment_ref: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        let result = sqlx::query(
            "UPDATE bookings
             SET payment_status = $2,
                 payment_ref = COALESCE($3, payment_ref),
                 updated_at = $4
             WHERE id = $1",
        )
        .bind(booking_id)
        .bind(payment_status_str(payment_status))
        .bind(payment_ref)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<BookingRow>, BookingError> {
        let records = sqlx::query_as::<_, BookingRecord>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE status = 'PENDING' AND expires_at <= $1
             ORDER BY expires_at
             LIMIT $2"
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        records.into_iter().map(BookingRecord::into_row).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BookingRecord {
    id: Uuid,
    user_id: Uuid,
    show_id: Uuid,
    seat_ids: Vec<Uuid>,
    total_amount: Decimal,
    status: String,
    payment_status: String,
    payment_ref: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRecord {
    fn into_row(self) -> Result<BookingRow, BookingError> {
        Ok(BookingRow {
            id: self.id,
            user_id: self.user_id,
            show_id: self.show_id,
            seat_ids: self.seat_ids,
            total_amount: self.total_amount,
            status: parse_booking_status(&self.status)
                .ok_or_else(|| corrupt(self.id, "status", &self.status))?,
            payment_status: parse_payment_status(&self.payment_status)
                .ok_or_else(|| corrupt(self.id, "payment_status", &self.payment_status))?,
            payment_ref: self.payment_ref,
            created_at: self.created_at,
            expires_at: self.expires_at,
            updated_at: self.updated_at,
        })
    }
}

fn corrupt(id: Uuid, column: &str, value: &str) -> BookingError {
    BookingError::Store(format!("corrupt booking row {id}: {column}={value}"))
}

fn booking_status_str(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "PENDING",
        BookingStatus::Confirmed => "CONFIRMED",
        BookingStatus::Cancelled => "CANCELLED",
        BookingStatus::Expired => "EXPIRED",
    }
}

fn parse_booking_status(value: &str) -> Option<BookingStatus> {
    match value {
        "PENDING" => Some(BookingStatus::Pending),
        "CONFIRMED" => Some(BookingStatus::Confirmed),
        "CANCELLED" => Some(BookingStatus::Cancelled),
        "EXPIRED" => Some(BookingStatus::Expired),
        _ => None,
    }
}

fn payment_status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "PENDING",
        PaymentStatus::Processing => "PROCESSING",
        PaymentStatus::Completed => "COMPLETED",
        PaymentStatus::Failed => "FAILED",
        PaymentStatus::Refunded => "REFUNDED",
    }
}

fn parse_payment_status(value: &str) -> Option<PaymentStatus> {
    match value {
        "PENDING" => Some(PaymentStatus::Pending),
        "PROCESSING" => Some(PaymentStatus::Processing),
        "COMPLETED" => Some(PaymentStatus::Completed),
        "FAILED" => Some(PaymentStatus::Failed),
        "REFUNDED" => Some(PaymentStatus::Refunded),
        _ => None,
    }
}

fn store_error(error: sqlx::Error) -> BookingError {
    BookingError::Store(error.to_string())
}
