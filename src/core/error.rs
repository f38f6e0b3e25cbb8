//! Error kinds shared by the calendar client, the scheduling agent,
//! and the HTTP API.

use serde_json::{Value, json};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    /// Malformed or empty user message, or unusable tool arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid range: start {start} must be before end {end}")]
    InvalidRange { start: String, end: String },

    /// Network or auth failure talking to the calendar service
    #[error("Calendar unavailable: {0}")]
    CalendarUnavailable(String),

    /// The LLM or another upstream dependency could not be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Requested slot overlaps an existing event. Only ever handed to
    /// the LLM as information, never returned to a caller.
    #[error("Conflict detected: {0}")]
    ConflictDetected(String),
}

impl SchedulingError {
    pub fn invalid_range(start: impl ToString, end: impl ToString) -> Self {
        Self::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    /// Stable identifier used in tool-error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidRange { .. } => "invalid_range",
            Self::CalendarUnavailable(_) => "calendar_unavailable",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::ConflictDetected(_) => "conflict_detected",
        }
    }

    /// Structured payload handed back to the LLM in place of a tool
    /// result so it can phrase an apology or a follow up question.
    pub fn to_tool_payload(&self) -> Value {
        json!({
            "error": self.kind(),
            "message": self.to_string(),
        })
    }
}
