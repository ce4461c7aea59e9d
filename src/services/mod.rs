pub mod calendar;
pub mod invoice;
pub mod query;
pub mod validation;
