//! Free slot computation as the complement of busy intervals.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use super::models::{BusyInterval, FreeSlot};

/// Bookable hours of the day in the calendar's timezone. `end_hour`
/// is exclusive so `9..18` ends at 18:00.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 18,
        }
    }
}

impl WorkingHours {
    pub fn new(start_hour: u32, end_hour: u32) -> Option<Self> {
        if start_hour < end_hour && end_hour <= 24 {
            Some(Self {
                start_hour,
                end_hour,
            })
        } else {
            None
        }
    }

    /// The working window on `date`, or `None` when the local times
    /// don't exist (DST gaps).
    pub fn window(&self, date: NaiveDate, tz: Tz) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
        let start = tz
            .from_local_datetime(&date.and_hms_opt(self.start_hour, 0, 0)?)
            .earliest()?;
        let end = if self.end_hour == 24 {
            tz.from_local_datetime(&date.succ_opt()?.and_hms_opt(0, 0, 0)?)
                .earliest()?
        } else {
            tz.from_local_datetime(&date.and_hms_opt(self.end_hour, 0, 0)?)
                .earliest()?
        };
        Some((start, end))
    }
}

/// Gaps in `[window_start, window_end)` not covered by `busy`,
/// skipping anything before `not_before` and anything shorter than
/// `min_length`.
pub fn free_slots(
    busy: &[BusyInterval],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    not_before: Option<DateTime<Utc>>,
    min_length: Duration,
) -> Vec<FreeSlot> {
    let mut sorted = busy.to_vec();
    sorted.sort_by_key(|b| b.start);

    let mut cursor = match not_before {
        Some(t) if t > window_start => t,
        _ => window_start,
    };
    let mut free = Vec::new();

    for b in sorted.iter() {
        if cursor >= window_end || b.start >= window_end {
            break;
        }
        if b.end <= cursor {
            continue;
        }
        if cursor < b.start && b.start - cursor >= min_length {
            free.push(FreeSlot {
                start: cursor,
                end: b.start,
            });
        }
        cursor = cursor.max(b.end);
    }

    if cursor < window_end && window_end - cursor >= min_length {
        free.push(FreeSlot {
            start: cursor,
            end: window_end,
        });
    }

    free
}

/// Free slots in working hours for every day touched by
/// `[start, end)`, clipped to that range.
pub fn free_slots_in_working_hours(
    busy: &[BusyInterval],
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    hours: WorkingHours,
    not_before: Option<DateTime<Utc>>,
    min_length: Duration,
) -> Vec<FreeSlot> {
    let tz = start.timezone();
    let last_day = end.with_timezone(&tz).date_naive();
    let mut day = start.date_naive();
    let mut free = Vec::new();

    while day <= last_day {
        if let Some((open, close)) = hours.window(day, tz) {
            let window_start = open.max(start).with_timezone(&Utc);
            let window_end = close.min(end).with_timezone(&Utc);
            if window_start < window_end {
                free.extend(free_slots(
                    busy,
                    window_start,
                    window_end,
                    not_before,
                    min_length,
                ));
            }
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    free
}
