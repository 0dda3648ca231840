// =====================================================================================
// APPOINTMENT CELL - BOOKING, LIFECYCLE & CALENDAR
// =====================================================================================

pub mod models;
pub mod services;

pub use models::*;
pub use services::booking::BookingService;
pub use services::calendar::CalendarService;
pub use services::store::AppointmentStore;
