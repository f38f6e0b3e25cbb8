use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::core::SchedulingError;

/// Formats accepted for datetimes without an offset. These are
/// interpreted in the calendar's timezone.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse an RFC 3339 timestamp or a naive local datetime into the
/// given timezone.
pub fn parse_datetime(input: &str, tz: Tz) -> Result<DateTime<Tz>, SchedulingError> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&tz));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .ok_or_else(|| {
            SchedulingError::InvalidInput(format!(
                "Could not parse datetime '{}'. Use YYYY-MM-DDTHH:MM:SS",
                input
            ))
        })?;

    // Pick the earlier instant when the local time is ambiguous
    // (DST fall back) and reject times skipped by DST.
    tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
        SchedulingError::InvalidInput(format!("{} does not exist in {}", input, tz))
    })
}

/// Rejects empty and inverted ranges before anything touches the
/// network.
pub fn ensure_range<A: TimeZone, B: TimeZone>(
    start: &DateTime<A>,
    end: &DateTime<B>,
) -> Result<(), SchedulingError>
where
    A::Offset: std::fmt::Display,
    B::Offset: std::fmt::Display,
{
    if start.with_timezone(&Utc) >= end.with_timezone(&Utc) {
        return Err(SchedulingError::invalid_range(
            start.to_rfc3339(),
            end.to_rfc3339(),
        ));
    }
    Ok(())
}

/// Longest window a single availability lookup may cover
pub const MAX_WINDOW_DAYS: i64 = 31;

/// A validated time window to check for busy intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityQuery {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

impl AvailabilityQuery {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self, SchedulingError> {
        ensure_range(&start, &end)?;
        Ok(Self { start, end })
    }

    /// Same as `new` but also rejects windows longer than
    /// `MAX_WINDOW_DAYS`.
    pub fn bounded(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self, SchedulingError> {
        let query = Self::new(start, end)?;
        if end - start > Duration::days(MAX_WINDOW_DAYS) {
            return Err(SchedulingError::InvalidInput(format!(
                "Availability window is longer than {} days",
                MAX_WINDOW_DAYS
            )));
        }
        Ok(query)
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }
}

/// One occupied span as reported by the calendar's free/busy query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn overlaps<T: TimeZone>(&self, start: &DateTime<T>, end: &DateTime<T>) -> bool {
        self.start < end.with_timezone(&Utc) && start.with_timezone(&Utc) < self.end
    }
}

/// A gap between busy intervals that is open for booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub attendees: Vec<String>,
}

impl BookingRequest {
    pub fn new(
        title: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        attendees: Vec<String>,
        description: Option<String>,
    ) -> Result<Self, SchedulingError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SchedulingError::InvalidInput(
                "Event title must not be empty".to_string(),
            ));
        }
        ensure_range(&start, &end)?;
        if let Some(bad) = attendees.iter().find(|a| !a.contains('@')) {
            return Err(SchedulingError::InvalidInput(format!(
                "Attendee '{}' is not an email address",
                bad
            )));
        }
        let description = description.filter(|d| !d.trim().is_empty());

        Ok(Self {
            title: title.to_string(),
            description,
            start,
            end,
            attendees,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingResult {
    pub event_id: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub html_link: Option<String>,
    pub confirmation_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub attendees: Vec<String>,
}

/// Human readable rendering of a span in the calendar's timezone,
/// e.g. "Tue 2025-06-10 14:00 to 15:00 IST".
pub fn describe_span<T: TimeZone>(start: &DateTime<T>, end: &DateTime<T>, tz: Tz) -> String {
    let start = start.with_timezone(&tz);
    let end = end.with_timezone(&tz);
    if start.date_naive() == end.date_naive() {
        format!(
            "{} to {} {}",
            start.format("%a %Y-%m-%d %H:%M"),
            end.format("%H:%M"),
            start.format("%Z")
        )
    } else {
        format!(
            "{} to {} {}",
            start.format("%a %Y-%m-%d %H:%M"),
            end.format("%a %Y-%m-%d %H:%M"),
            start.format("%Z")
        )
    }
}
