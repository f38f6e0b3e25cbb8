//! Router for the calendar API

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use axum_extra::extract::Query;
use chrono::{Duration, Utc};

use crate::api::state::AppState;
use crate::calendar::{
    AvailabilityQuery, MAX_WINDOW_DAYS, free_slots_in_working_hours, parse_datetime,
};
use crate::core::SchedulingError;
use super::public;

type SharedState = Arc<AppState>;

const DEFAULT_DAYS_AHEAD: i64 = 7;
const MIN_SLOT_MINUTES: i64 = 15;

/// Busy intervals and free working-hour slots between two times.
/// Naive times are read in the calendar's timezone.
async fn availability_handler(
    State(state): State<SharedState>,
    Query(params): Query<public::AvailabilityParams>,
) -> Result<Json<public::AvailabilityResponse>, crate::api::public::ApiError> {
    let tz = state.config.timezone;
    let start = parse_datetime(&params.start, tz)?;
    let end = parse_datetime(&params.end, tz)?;
    let query = AvailabilityQuery::bounded(start, end)?;

    let busy = state.calendar.get_busy(&query).await?;
    let free = free_slots_in_working_hours(
        &busy,
        start,
        end,
        state.config.working_hours,
        Some(Utc::now()),
        Duration::minutes(MIN_SLOT_MINUTES),
    );

    Ok(Json(public::AvailabilityResponse {
        timezone: tz.name().to_string(),
        busy,
        free,
    }))
}

/// Upcoming events from now through `days_ahead` days
async fn events_handler(
    State(state): State<SharedState>,
    Query(params): Query<public::EventsParams>,
) -> Result<Json<public::EventsResponse>, crate::api::public::ApiError> {
    // Default to 7 days ahead if not specified
    let days_ahead = params.days_ahead.unwrap_or(DEFAULT_DAYS_AHEAD);
    if !(1..=MAX_WINDOW_DAYS).contains(&days_ahead) {
        return Err(SchedulingError::InvalidInput(format!(
            "days_ahead must be between 1 and {}",
            MAX_WINDOW_DAYS
        ))
        .into());
    }

    let now = Utc::now().with_timezone(&state.config.timezone);
    let query = AvailabilityQuery::new(now, now + Duration::days(days_ahead))?;
    let events = state.calendar.list_events(&query).await?;

    Ok(Json(public::EventsResponse { events }))
}

/// Create the calendar router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/availability", get(availability_handler))
        .route("/events", get(events_handler))
}
