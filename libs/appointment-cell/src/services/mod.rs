pub mod booking;
pub mod calendar;
pub mod conflict;
pub mod lifecycle;
pub mod store;

pub use booking::BookingService;
pub use calendar::CalendarService;
pub use conflict::ConflictService;
pub use lifecycle::LifecycleService;
pub use store::AppointmentStore;
