//! Marquee Store — PostgreSQL implementations of the store traits.
//!
//! Every conditional update is a single `UPDATE ... WHERE <guard>`
//! statement, so the row-level predicate and the write are atomic even
//! across processes.

pub mod pg_booking_store;
pub mod pg_seat_store;
pub mod pg_show_catalog;
pub mod schema;
pub mod seed;

pub use pg_booking_store::PgBookingStore;
pub use pg_seat_store::PgSeatStore;
pub use pg_show_catalog::PgShowCatalog;
