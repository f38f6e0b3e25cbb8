//! The closed set of tools the scheduling agent can call. Arguments
//! from the LLM are parsed into `ToolRequest` before anything touches
//! the calendar so a bad call never reaches the calendar API.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::calendar::{Calendar, WorkingHours};
use crate::core::SchedulingError;

pub mod availability;
pub use availability::{CHECK_AVAILABILITY, CheckAvailabilityArgs};

pub mod booking;
pub use booking::{CREATE_EVENT, CreateEventArgs};

/// Everything a tool needs to run. Borrowed per request.
pub struct ToolContext<'a> {
    pub calendar: &'a dyn Calendar,
    pub timezone: Tz,
    pub working_hours: WorkingHours,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    CheckAvailability(CheckAvailabilityArgs),
    CreateEvent(CreateEventArgs),
}

impl ToolRequest {
    /// Validate a raw tool call from the LLM.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, SchedulingError> {
        match name {
            CHECK_AVAILABILITY => Ok(Self::CheckAvailability(parse_args(name, arguments)?)),
            CREATE_EVENT => Ok(Self::CreateEvent(parse_args(name, arguments)?)),
            other => Err(SchedulingError::InvalidInput(format!(
                "Unknown tool '{}'",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckAvailability(_) => CHECK_AVAILABILITY,
            Self::CreateEvent(_) => CREATE_EVENT,
        }
    }

    /// Run the tool and return the JSON payload for the LLM. Failures
    /// become `{"error": kind, "message": ...}` payloads rather than
    /// aborting the conversation.
    pub async fn execute(&self, ctx: &ToolContext<'_>) -> Value {
        let result = match self {
            Self::CheckAvailability(args) => availability::check_availability(args, ctx).await,
            Self::CreateEvent(args) => booking::create_event(args, ctx).await,
        };
        result.unwrap_or_else(|e| {
            tracing::error!("Tool {} failed: {}", self.name(), e);
            e.to_tool_payload()
        })
    }
}

fn parse_args<T: DeserializeOwned>(name: &str, arguments: &str) -> Result<T, SchedulingError> {
    // Some models send an empty string instead of `{}`
    let arguments = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    serde_json::from_str(arguments).map_err(|e| {
        SchedulingError::InvalidInput(format!("Invalid arguments for {}: {}", name, e))
    })
}

/// Tool schemas for the `tools` field of a chat completion request.
pub fn definitions() -> Vec<Value> {
    vec![
        json!(availability::definition()),
        json!(booking::definition()),
    ]
}
