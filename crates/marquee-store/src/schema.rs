//! Booking database schema.
//!
//! Mirrors `migrations/`; the constants exist so operational tooling can
//! bootstrap a database without the migration files on disk.

/// SQL to create the shows, seats, and bookings tables.
pub const CREATE_BOOKING_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS shows (
    id          UUID PRIMARY KEY,
    movie_id    UUID NOT NULL,
    screen_id   UUID NOT NULL,
    starts_at   TIMESTAMPTZ NOT NULL,
    ends_at     TIMESTAMPTZ NOT NULL,
    base_price  NUMERIC(10, 2) NOT NULL,
    status      VARCHAR(16) NOT NULL
);

CREATE TABLE IF NOT EXISTS show_seats (
    id                UUID PRIMARY KEY,
    show_id           UUID NOT NULL,
    status            VARCHAR(16) NOT NULL,
    holder_booking_id UUID,
    locked_until      TIMESTAMPTZ,
    price             NUMERIC(10, 2) NOT NULL,
    updated_at        TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_show_seats_show_id
    ON show_seats (show_id);

CREATE INDEX IF NOT EXISTS idx_show_seats_expired_locks
    ON show_seats (locked_until)
    WHERE status = 'LOCKED';

CREATE TABLE IF NOT EXISTS bookings (
    id             UUID PRIMARY KEY,
    user_id        UUID NOT NULL,
    show_id        UUID NOT NULL,
    seat_ids       UUID[] NOT NULL,
    total_amount   NUMERIC(10, 2) NOT NULL,
    status         VARCHAR(16) NOT NULL,
    payment_status VARCHAR(16) NOT NULL,
    payment_ref    TEXT,
    created_at     TIMESTAMPTZ NOT NULL,
    expires_at     TIMESTAMPTZ NOT NULL,
    updated_at     TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bookings_user_id
    ON bookings (user_id);

CREATE INDEX IF NOT EXISTS idx_bookings_show_id
    ON bookings (show_id);

CREATE INDEX IF NOT EXISTS idx_bookings_expired_pending
    ON bookings (expires_at)
    WHERE status = 'PENDING';
";
