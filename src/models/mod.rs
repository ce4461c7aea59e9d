pub mod booking;
pub mod timestamp;

pub use booking::{Booking, BookingChanges, CarDetails, DEFAULT_STATUS};
