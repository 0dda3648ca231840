// =====================================================================================
// AVAILABILITY CELL - PROVIDER BOOKABLE TIME
// =====================================================================================

pub mod models;
pub mod services;

pub use models::*;
pub use services::schedule::AvailabilityService;
