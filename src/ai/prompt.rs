//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. This is ideal since output
//! from LLMs should be considered untrusted and Handlebars forces you
//! to add only what you need.

use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use handlebars::{Handlebars, handlebars_helper};
use serde::Serialize;

use crate::calendar::WorkingHours;

// Zero pads an hour so working hours render as "09:00"
handlebars_helper!(hour: |v: u64| format!("{:02}:00", v));

#[derive(Debug)]
pub enum Prompt {
    SchedulingAssistant,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// Implement the Into trait so that Prompt can be converted to an &str
impl From<Prompt> for String {
    fn from(item: Prompt) -> String {
        format!("{:?}", item)
    }
}

const SCHEDULING_ASSISTANT_PROMPT: &str = r"
You are a helpful assistant that books appointments on a single shared calendar.

Current date and time: {{now}} ({{weekday}})
Today: {{today}}
Tomorrow: {{tomorrow}}
Timezone: {{timezone}}. Interpret every date and time the user gives in this timezone unless they name another one.
Working hours: {{hour workday_start}} to {{hour workday_end}}. Only suggest or book times inside working hours unless the user insists.
Default appointment length: {{default_duration}} minutes when the user does not say how long.

Tools:
- check_availability: takes `start` and `end` as YYYY-MM-DDTHH:MM:SS local times and returns busy intervals and free slots. For a whole day use 00:00:00 to 23:59:00.
- create_event: books an event. Only set `override_conflicts` to true when the user explicitly asked to double book.

Rules:
- Always check availability before booking and confirm the title, date, time and duration with the user before calling create_event.
- If the user asks to book a specific time and has already given a title and time, check availability and book it if it is free.
- If the requested time is busy or create_event reports a conflict, say so and offer the suggested free slots instead. Never book over a conflict without permission.
- When a tool returns an error, apologise briefly, explain what went wrong in plain words and suggest what to try next.
- List free and busy times as short bullet points with start and end times.
- Be polite and concise. Ask a clarifying question when the request is ambiguous.
";

#[derive(Serialize)]
struct SchedulingContext {
    now: String,
    weekday: String,
    today: String,
    tomorrow: String,
    timezone: String,
    workday_start: u32,
    workday_end: u32,
    default_duration: i64,
}

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_helper("hour", Box::new(hour));
    registry
        .register_template_string(
            &Prompt::SchedulingAssistant.to_string(),
            SCHEDULING_ASSISTANT_PROMPT,
        )
        .expect("Failed to register template");
    registry
}

/// Render the system prompt for a conversation happening at `now`.
pub fn scheduling_system_prompt(
    now: DateTime<Tz>,
    working_hours: WorkingHours,
    default_duration_minutes: i64,
) -> Result<String> {
    let context = SchedulingContext {
        now: now.format("%Y-%m-%d %H:%M").to_string(),
        weekday: now.format("%A").to_string(),
        today: now.format("%Y-%m-%d").to_string(),
        tomorrow: (now + Duration::days(1)).format("%Y-%m-%d").to_string(),
        timezone: now.timezone().name().to_string(),
        workday_start: working_hours.start_hour,
        workday_end: working_hours.end_hour,
        default_duration: default_duration_minutes,
    };
    let prompt = templates().render(&Prompt::SchedulingAssistant.to_string(), &context)?;
    Ok(prompt)
}
