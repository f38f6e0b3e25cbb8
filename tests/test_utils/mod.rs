//! Test utilities for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use booker::ai::SchedulingAgent;
use booker::api::AppState;
use booker::api::app;
use booker::calendar::{
    AvailabilityQuery, BookingRequest, BookingResult, BusyInterval, Calendar, CalendarEvent,
    SharedCalendar,
};
use booker::core::{AppConfig, SchedulingError};

/// Nothing listens here so requests to it fail fast
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

pub fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

/// 2025-06-10 08:00 IST, a Tuesday
pub fn fixed_now() -> DateTime<Utc> {
    utc("2025-06-10T02:30:00Z")
}

/// Calendar backed by memory that records every call made to it.
#[derive(Default)]
pub struct FakeCalendar {
    busy: Vec<BusyInterval>,
    events: Vec<CalendarEvent>,
    unavailable: bool,
    busy_queries: Mutex<Vec<AvailabilityQuery>>,
    created: Mutex<Vec<BookingRequest>>,
}

impl FakeCalendar {
    pub fn with_busy(busy: Vec<BusyInterval>) -> Self {
        Self {
            busy,
            ..Default::default()
        }
    }

    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn busy_queries(&self) -> Vec<AvailabilityQuery> {
        self.busy_queries.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<BookingRequest> {
        self.created.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), SchedulingError> {
        if self.unavailable {
            Err(SchedulingError::CalendarUnavailable(
                "403 Forbidden".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Calendar for FakeCalendar {
    async fn get_busy(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<BusyInterval>, SchedulingError> {
        self.check_available()?;
        self.busy_queries.lock().unwrap().push(query.clone());
        Ok(self
            .busy
            .iter()
            .filter(|b| b.overlaps(&query.start(), &query.end()))
            .cloned()
            .collect())
    }

    async fn create_event(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingResult, SchedulingError> {
        self.check_available()?;
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        Ok(BookingResult {
            event_id: format!("evt_{}", created.len()),
            start: request.start,
            end: request.end,
            html_link: Some(String::from("https://calendar.example.com/evt")),
            confirmation_text: format!("'{}' booked", request.title),
        })
    }

    async fn list_events(
        &self,
        _query: &AvailabilityQuery,
    ) -> Result<Vec<CalendarEvent>, SchedulingError> {
        self.check_available()?;
        Ok(self.events.clone())
    }
}

pub fn test_config(llm_url: &str) -> AppConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("BOOKER_CALENDAR_ID", "team@example.com"),
        ("GOOGLE_APPLICATION_CREDENTIALS", "/nonexistent/credentials.json"),
        ("OPENAI_API_KEY", "test-api-key"),
        ("BOOKER_LLM_HOST", llm_url),
        ("BOOKER_LLM_MODEL", "gpt-4o"),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("Failed to build test config")
}

/// Creates a test application router around `calendar` with the LLM
/// at `llm_url` and the agent's clock pinned to `fixed_now()`.
pub fn test_app(llm_url: &str, calendar: Arc<FakeCalendar>) -> Router {
    let config = test_config(llm_url);
    let calendar: SharedCalendar = calendar;
    let agent = SchedulingAgent::builder(
        &config.openai_api_hostname,
        &config.openai_api_key,
        &config.openai_model,
        calendar.clone(),
    )
    .timezone(config.timezone)
    .working_hours(config.working_hours)
    .default_duration_minutes(config.default_duration_minutes)
    .now(fixed_now())
    .build();
    let app_state = AppState::with_agent(config, calendar, agent);
    app(Arc::new(app_state))
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A chat completion where the model calls one tool
pub fn tool_call_completion(id: &str, name: &str, arguments: Value) -> String {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments.to_string()}
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
    .to_string()
}

/// A chat completion where the model answers with text
pub fn content_completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-124",
        "object": "chat.completion",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}
