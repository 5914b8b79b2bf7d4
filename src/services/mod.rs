pub mod blocking;
pub mod booking;
pub mod query;
pub mod schedule;
pub mod sweep;
