//! Route modules for the booking API.

pub mod bookings;
pub mod health;
pub mod shows;
pub mod users;
