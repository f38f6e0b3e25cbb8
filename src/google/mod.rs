pub mod gcal;
pub use gcal::{CalendarConfig, GoogleCalendar};

pub mod oauth;
