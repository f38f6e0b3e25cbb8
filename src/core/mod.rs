mod config;
pub use config::AppConfig;
pub mod error;
pub use error::SchedulingError;
