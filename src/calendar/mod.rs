//! Calendar domain types and the seam between the scheduling agent
//! and whatever calendar backs it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::SchedulingError;

mod models;
pub use models::{
    AvailabilityQuery, BookingRequest, BookingResult, BusyInterval, CalendarEvent, FreeSlot,
    MAX_WINDOW_DAYS, describe_span, ensure_range, parse_datetime,
};

mod slots;
pub use slots::{WorkingHours, free_slots, free_slots_in_working_hours};

/// Operations the agent needs from a calendar. Implementations hold
/// no state between calls and must reject inverted ranges with
/// `SchedulingError::InvalidRange` before doing any I/O.
#[async_trait]
pub trait Calendar: Send + Sync {
    async fn get_busy(&self, query: &AvailabilityQuery)
    -> Result<Vec<BusyInterval>, SchedulingError>;

    /// Writes to the shared calendar. Not idempotent and does not
    /// check for conflicts.
    async fn create_event(&self, request: &BookingRequest)
    -> Result<BookingResult, SchedulingError>;

    async fn list_events(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<CalendarEvent>, SchedulingError>;
}

pub type SharedCalendar = Arc<dyn Calendar>;
