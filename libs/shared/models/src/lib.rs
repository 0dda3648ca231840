pub mod collaborators;
pub mod error;
pub mod time;

pub use collaborators::*;
pub use error::SchedulingError;
pub use time::TimeRange;
