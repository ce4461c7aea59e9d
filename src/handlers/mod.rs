pub mod bookings;
pub mod exports;
pub mod health;
