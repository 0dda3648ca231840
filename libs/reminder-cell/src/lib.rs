// =====================================================================================
// REMINDER CELL - DERIVED REMINDER EVENTS
// =====================================================================================

pub mod models;
pub mod services;

pub use models::*;
pub use services::scheduler::ReminderScheduler;
