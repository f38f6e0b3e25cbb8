use anyhow::{Error, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;

use super::models::{ConversationTurn, Transcript};
use crate::ai::prompt::scheduling_system_prompt;
use crate::ai::tools::{ToolContext, ToolRequest, definitions};
use crate::calendar::{SharedCalendar, WorkingHours};
use crate::core::{AppConfig, SchedulingError};
use crate::openai::{FunctionCall, Message, completion};

const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

const GREETING_REPLY: &str = "Hello! I'm your appointment booking assistant. I can check availability and book appointments on the calendar. What would you like to do?";

const HELP_REPLY: &str = "I can help you with:\n- Checking availability for a day or time range\n- Booking appointments\n- Suggesting free time slots\n\nTry saying 'Check availability for today' or 'Book a meeting tomorrow at 2 PM'.";

/// Replies that don't need the LLM. Only exact, bare greetings and
/// requests for help match so "hi, book me at 3" still goes through.
fn canned_reply(message: &str) -> Option<&'static str> {
    let normalized = message
        .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_lowercase();
    match normalized.as_str() {
        "hi" | "hello" | "hey" | "hi there" | "hello there" => Some(GREETING_REPLY),
        "help" | "/help" => Some(HELP_REPLY),
        _ => None,
    }
}

/// Wraps an OpenAI compatible LLM with the scheduling tools and runs
/// the tool-call loop against a calendar.
///
/// Holds no per-conversation state so one agent can serve concurrent
/// requests. Conversation continuity comes from the `history` passed
/// to `respond`.
///
/// Use `SchedulingAgent::builder()` to construct a valid agent.
pub struct SchedulingAgent {
    api_hostname: String,
    api_key: String,
    model: String,
    calendar: SharedCalendar,
    timezone: Tz,
    working_hours: WorkingHours,
    default_duration_minutes: i64,
    max_tool_rounds: usize,
    // Pinned clock, otherwise the wall clock at request time
    now: Option<DateTime<Utc>>,
}

impl SchedulingAgent {
    pub fn builder(
        api_hostname: &str,
        api_key: &str,
        model: &str,
        calendar: SharedCalendar,
    ) -> AgentBuilder {
        AgentBuilder::new(api_hostname, api_key, model, calendar)
    }

    pub fn from_config(config: &AppConfig, calendar: SharedCalendar) -> Self {
        Self::builder(
            &config.openai_api_hostname,
            &config.openai_api_key,
            &config.openai_model,
            calendar,
        )
        .timezone(config.timezone)
        .working_hours(config.working_hours)
        .default_duration_minutes(config.default_duration_minutes)
        .build()
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Run the tool calls from one LLM response in order, returning
    /// the assistant request message followed by one tool response
    /// per call.
    async fn handle_tool_calls(
        ctx: &ToolContext<'_>,
        tool_calls: Vec<FunctionCall>,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(tool_calls.len() + 1);
        let mut responses = Vec::with_capacity(tool_calls.len());

        for call in tool_calls.iter() {
            tracing::debug!(
                "\nTool call: {}\nargs: {}",
                &call.function.name,
                &call.function.arguments
            );
            let payload = match ToolRequest::parse(&call.function.name, &call.function.arguments)
            {
                Ok(request) => request.execute(ctx).await,
                Err(e) => {
                    tracing::error!("Rejected tool call {}: {}", call.function.name, e);
                    e.to_tool_payload()
                }
            };
            tracing::debug!("Tool result: {}", payload);
            responses.push(Message::new_tool_call_response(
                &payload.to_string(),
                &call.id,
            ));
        }

        messages.push(Message::new_tool_call_request(tool_calls));
        messages.extend(responses);
        messages
    }

    /// Answer `message` given the prior `history`. Tool failures are
    /// handed to the LLM to explain, LLM failures come back as
    /// `SchedulingError::ServiceUnavailable`.
    pub async fn respond(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<String, Error> {
        let message = message.trim();
        if message.is_empty() {
            return Err(
                SchedulingError::InvalidInput("Message must not be empty".to_string()).into(),
            );
        }
        if let Some(reply) = canned_reply(message) {
            return Ok(reply.to_string());
        }

        let now = self.now.unwrap_or_else(Utc::now);
        let system_prompt = scheduling_system_prompt(
            now.with_timezone(&self.timezone),
            self.working_hours,
            self.default_duration_minutes,
        )?;
        let mut transcript = Transcript::new(&system_prompt, history, message);
        let tools = definitions();
        let ctx = ToolContext {
            calendar: self.calendar.as_ref(),
            timezone: self.timezone,
            working_hours: self.working_hours,
            now,
        };

        for round in 0..=self.max_tool_rounds {
            let resp = completion(
                transcript.messages(),
                &tools,
                &self.api_hostname,
                &self.api_key,
                &self.model,
            )
            .await?;

            let tool_calls = parse_tool_calls(&resp)?;
            if tool_calls.is_empty() {
                return match resp["choices"][0]["message"]["content"].as_str() {
                    Some(content) => Ok(content.to_string()),
                    None => Err(SchedulingError::ServiceUnavailable(format!(
                        "No message received from LLM: {}",
                        resp
                    ))
                    .into()),
                };
            }
            if round == self.max_tool_rounds {
                break;
            }

            // Provide the results of the tool calls back to the chat
            for m in Self::handle_tool_calls(&ctx, tool_calls).await {
                transcript.push(m);
            }
        }

        tracing::error!(
            "Giving up after {} rounds of tool calls",
            self.max_tool_rounds
        );
        Err(SchedulingError::ServiceUnavailable(format!(
            "LLM kept calling tools after {} rounds",
            self.max_tool_rounds
        ))
        .into())
    }
}

fn parse_tool_calls(resp: &Value) -> Result<Vec<FunctionCall>, SchedulingError> {
    match &resp["choices"][0]["message"]["tool_calls"] {
        Value::Array(calls) if !calls.is_empty() => {
            serde_json::from_value(Value::Array(calls.clone())).map_err(|e| {
                SchedulingError::ServiceUnavailable(format!(
                    "Malformed tool calls from LLM: {}",
                    e
                ))
            })
        }
        _ => Ok(Vec::new()),
    }
}

pub struct AgentBuilder {
    api_hostname: String,
    api_key: String,
    model: String,
    calendar: SharedCalendar,
    timezone: Tz,
    working_hours: WorkingHours,
    default_duration_minutes: i64,
    max_tool_rounds: usize,
    now: Option<DateTime<Utc>>,
}

impl AgentBuilder {
    pub fn new(api_hostname: &str, api_key: &str, model: &str, calendar: SharedCalendar) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            calendar,
            timezone: Tz::Asia__Kolkata,
            working_hours: WorkingHours::default(),
            default_duration_minutes: 60,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            now: None,
        }
    }

    pub fn build(self) -> SchedulingAgent {
        SchedulingAgent {
            api_hostname: self.api_hostname,
            api_key: self.api_key,
            model: self.model,
            calendar: self.calendar,
            timezone: self.timezone,
            working_hours: self.working_hours,
            default_duration_minutes: self.default_duration_minutes,
            max_tool_rounds: self.max_tool_rounds,
            now: self.now,
        }
    }

    pub fn timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn working_hours(mut self, working_hours: WorkingHours) -> Self {
        self.working_hours = working_hours;
        self
    }

    pub fn default_duration_minutes(mut self, minutes: i64) -> Self {
        self.default_duration_minutes = minutes;
        self
    }

    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Pin the clock the agent uses for "today" and for skipping past
    /// free slots.
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}
