pub mod scheduler;

pub use scheduler::ReminderScheduler;
