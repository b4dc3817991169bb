//! Business logic services for the application layer.

pub mod single_flight;
pub mod user_accessor;

pub use single_flight::SingleFlight;
pub use user_accessor::{AccessorConfig, UserAccessor, WriteOp, WriteOutcome};
