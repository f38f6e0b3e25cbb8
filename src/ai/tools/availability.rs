use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::ToolContext;
use crate::calendar::{
    AvailabilityQuery, describe_span, free_slots_in_working_hours, parse_datetime,
};
use crate::core::SchedulingError;
use crate::openai::{Function, Parameters, Property, ToolDefinition, ToolType};

pub const CHECK_AVAILABILITY: &str = "check_availability";

// Gaps shorter than this are not worth offering
const MIN_SLOT_MINUTES: i64 = 15;

#[derive(Serialize)]
pub struct CheckAvailabilityProps {
    pub start: Property,
    pub end: Property,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckAvailabilityArgs {
    pub start: String,
    pub end: String,
}

pub fn definition() -> ToolDefinition<CheckAvailabilityProps> {
    ToolDefinition {
        r#type: ToolType::Function,
        function: Function {
            name: String::from(CHECK_AVAILABILITY),
            description: String::from(
                "List busy intervals and free slots on the calendar between two local times.",
            ),
            parameters: Parameters {
                r#type: String::from("object"),
                properties: CheckAvailabilityProps {
                    start: Property::new(
                        "string",
                        "Start of the window as YYYY-MM-DDTHH:MM:SS in the calendar timezone.",
                    ),
                    end: Property::new(
                        "string",
                        "End of the window as YYYY-MM-DDTHH:MM:SS in the calendar timezone. Must be after start.",
                    ),
                },
                required: vec![String::from("start"), String::from("end")],
                additional_properties: false,
            },
            strict: true,
        },
    }
}

pub async fn check_availability(
    args: &CheckAvailabilityArgs,
    ctx: &ToolContext<'_>,
) -> Result<Value, SchedulingError> {
    let tz = ctx.timezone;
    let start = parse_datetime(&args.start, tz)?;
    let end = parse_datetime(&args.end, tz)?;
    let query = AvailabilityQuery::bounded(start, end)?;

    let busy = ctx.calendar.get_busy(&query).await?;
    let free = free_slots_in_working_hours(
        &busy,
        start,
        end,
        ctx.working_hours,
        Some(ctx.now),
        Duration::minutes(MIN_SLOT_MINUTES),
    );

    Ok(json!({
        "timezone": tz.name(),
        "window": describe_span(&start, &end, tz),
        "busy": busy
            .iter()
            .map(|b| describe_span(&b.start, &b.end, tz))
            .collect::<Vec<_>>(),
        "free": free
            .iter()
            .map(|f| describe_span(&f.start, &f.end, tz))
            .collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::tools::tests::{StubCalendar, context, utc};
    use crate::calendar::BusyInterval;

    #[tokio::test]
    async fn test_check_availability_lists_busy_and_free() {
        // 10:00-11:00 IST
        let calendar = StubCalendar::with_busy(vec![BusyInterval {
            start: utc("2025-06-10T04:30:00Z"),
            end: utc("2025-06-10T05:30:00Z"),
        }]);
        let ctx = context(&calendar);
        let args = CheckAvailabilityArgs {
            start: "2025-06-10T00:00:00".into(),
            end: "2025-06-10T23:59:00".into(),
        };

        let out = check_availability(&args, &ctx).await.unwrap();

        assert_eq!(out["timezone"], "Asia/Kolkata");
        assert_eq!(out["busy"], json!(["Tue 2025-06-10 10:00 to 11:00 IST"]));
        assert_eq!(
            out["free"],
            json!([
                "Tue 2025-06-10 09:00 to 10:00 IST",
                "Tue 2025-06-10 11:00 to 18:00 IST"
            ])
        );
        assert_eq!(calendar.busy_queries().len(), 1);
    }

    #[tokio::test]
    async fn test_check_availability_rejects_inverted_window() {
        let calendar = StubCalendar::default();
        let ctx = context(&calendar);
        let args = CheckAvailabilityArgs {
            start: "2025-06-10T18:00:00".into(),
            end: "2025-06-10T09:00:00".into(),
        };

        let err = check_availability(&args, &ctx).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_range");
        assert!(calendar.busy_queries().is_empty());
    }

    #[tokio::test]
    async fn test_check_availability_rejects_huge_window() {
        let calendar = StubCalendar::default();
        let ctx = context(&calendar);
        let args = CheckAvailabilityArgs {
            start: "2025-06-10T00:00:00".into(),
            end: "2025-09-10T00:00:00".into(),
        };

        let err = check_availability(&args, &ctx).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert!(calendar.busy_queries().is_empty());
    }
}
