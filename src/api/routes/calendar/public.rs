//! Public types for the calendar API
use serde::{Deserialize, Serialize};

use crate::calendar::{BusyInterval, CalendarEvent, FreeSlot};

#[derive(Deserialize)]
pub struct AvailabilityParams {
    pub start: String,
    pub end: String,
}

#[derive(Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub timezone: String,
    pub busy: Vec<BusyInterval>,
    pub free: Vec<FreeSlot>,
}

#[derive(Deserialize)]
pub struct EventsParams {
    pub days_ahead: Option<i64>,
}

#[derive(Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<CalendarEvent>,
}
