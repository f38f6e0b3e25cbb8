use chrono::{DateTime, Duration, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::ToolContext;
use crate::calendar::{
    AvailabilityQuery, BookingRequest, BusyInterval, FreeSlot, describe_span,
    free_slots_in_working_hours, parse_datetime,
};
use crate::core::SchedulingError;
use crate::openai::{Function, Parameters, Property, ToolDefinition, ToolType};

pub const CREATE_EVENT: &str = "create_event";

const SUGGESTION_HORIZON_DAYS: i64 = 7;
const MAX_SUGGESTIONS: usize = 3;

#[derive(Serialize)]
pub struct CreateEventProps {
    pub title: Property,
    pub start: Property,
    pub end: Property,
    pub attendees: Property,
    pub description: Property,
    pub override_conflicts: Property,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateEventArgs {
    pub title: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub override_conflicts: bool,
}

pub fn definition() -> ToolDefinition<CreateEventProps> {
    ToolDefinition {
        r#type: ToolType::Function,
        function: Function {
            name: String::from(CREATE_EVENT),
            description: String::from(
                "Book an event on the calendar. Refuses and suggests other slots when the time is busy unless override_conflicts is true.",
            ),
            parameters: Parameters {
                r#type: String::from("object"),
                properties: CreateEventProps {
                    title: Property::new("string", "Short title of the appointment."),
                    start: Property::new(
                        "string",
                        "Start as YYYY-MM-DDTHH:MM:SS in the calendar timezone.",
                    ),
                    end: Property::new(
                        "string",
                        "End as YYYY-MM-DDTHH:MM:SS in the calendar timezone. Must be after start.",
                    ),
                    attendees: Property::array_of(
                        "string",
                        "Email addresses to invite. Use an empty list when there are none.",
                    ),
                    description: Property::new(
                        "string",
                        "Optional notes for the event. Use an empty string when there are none.",
                    ),
                    override_conflicts: Property::new(
                        "boolean",
                        "True only when the user explicitly asked to book over an existing event.",
                    ),
                },
                required: vec![
                    String::from("title"),
                    String::from("start"),
                    String::from("end"),
                    String::from("attendees"),
                    String::from("description"),
                    String::from("override_conflicts"),
                ],
                additional_properties: false,
            },
            strict: true,
        },
    }
}

/// Book the requested slot, or report the clash along with nearby
/// free slots of the same length.
pub async fn create_event(
    args: &CreateEventArgs,
    ctx: &ToolContext<'_>,
) -> Result<Value, SchedulingError> {
    let tz = ctx.timezone;
    let start = parse_datetime(&args.start, tz)?;
    let end = parse_datetime(&args.end, tz)?;
    let request = BookingRequest::new(
        &args.title,
        start,
        end,
        args.attendees.clone(),
        args.description.clone(),
    )?;

    if !args.override_conflicts {
        let query = AvailabilityQuery::new(request.start, request.end)?;
        let conflicts: Vec<BusyInterval> = ctx
            .calendar
            .get_busy(&query)
            .await?
            .into_iter()
            .filter(|b| b.overlaps(&request.start, &request.end))
            .collect();

        if !conflicts.is_empty() {
            tracing::info!(
                "Not booking '{}': {} conflicting interval(s)",
                request.title,
                conflicts.len()
            );
            let suggestions = suggest_alternatives(ctx, &request)
                .await
                .inspect_err(|e| tracing::error!("Could not compute suggestions: {}", e))
                .unwrap_or_default();

            let err = SchedulingError::ConflictDetected(format!(
                "{} overlaps an existing event",
                describe_span(&request.start, &request.end, tz)
            ));
            let mut payload = err.to_tool_payload();
            payload["conflicts"] = json!(
                conflicts
                    .iter()
                    .map(|b| describe_span(&b.start, &b.end, tz))
                    .collect::<Vec<_>>()
            );
            payload["suggestions"] = json!(
                suggestions
                    .iter()
                    .map(|s| describe_span(&s.start, &s.end, tz))
                    .collect::<Vec<_>>()
            );
            return Ok(payload);
        }
    }

    let result = ctx.calendar.create_event(&request).await?;

    Ok(json!({
        "status": "booked",
        "event_id": result.event_id,
        "title": request.title,
        "start": result.start.to_rfc3339(),
        "end": result.end.to_rfc3339(),
        "when": describe_span(&result.start, &result.end, tz),
        "link": result.html_link,
        "confirmation": result.confirmation_text,
    }))
}

/// Up to `MAX_SUGGESTIONS` free slots with the requested duration,
/// nearest to the requested start first, searched from the start of
/// the requested day over the next few days.
async fn suggest_alternatives(
    ctx: &ToolContext<'_>,
    request: &BookingRequest,
) -> Result<Vec<FreeSlot>, SchedulingError> {
    let tz = request.timezone();
    let duration = request.end - request.start;
    let day_start = start_of_day(request.start, tz);
    let horizon_end = day_start + Duration::days(SUGGESTION_HORIZON_DAYS);

    let query = AvailabilityQuery::new(day_start, horizon_end)?;
    let busy = ctx.calendar.get_busy(&query).await?;
    let gaps = free_slots_in_working_hours(
        &busy,
        day_start,
        horizon_end,
        ctx.working_hours,
        Some(ctx.now),
        duration,
    );

    let requested = request.start.to_utc();
    let mut candidates: Vec<FreeSlot> = gaps
        .into_iter()
        .map(|gap| {
            // Hug the requested time: latest slot in gaps before it,
            // earliest slot in gaps after it
            let start = if gap.end <= requested {
                gap.end - duration
            } else if gap.start >= requested {
                gap.start
            } else {
                requested.min(gap.end - duration)
            };
            FreeSlot {
                start,
                end: start + duration,
            }
        })
        .collect();

    candidates.sort_by_key(|slot| (slot.start - requested).abs());
    candidates.truncate(MAX_SUGGESTIONS);
    candidates.sort_by_key(|slot| slot.start);
    Ok(candidates)
}

fn start_of_day(dt: DateTime<Tz>, tz: Tz) -> DateTime<Tz> {
    dt.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .unwrap_or(dt)
}
