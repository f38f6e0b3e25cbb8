//! Google Calendar v3 client: free/busy queries, event insertion and
//! event listing against a single configured calendar.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::oauth::Credentials;
use crate::calendar::{
    AvailabilityQuery, BookingRequest, BookingResult, BusyInterval, Calendar, CalendarEvent,
    describe_span, ensure_range,
};
use crate::core::SchedulingError;

#[derive(Clone, Debug)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub credentials_path: PathBuf,
    pub api_base_url: String,
    pub timezone: Tz,
}

// Request and response shapes from the Calendar API reference

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest<'a> {
    time_min: String,
    time_max: String,
    time_zone: &'a str,
    items: Vec<FreeBusyItem<'a>>,
}

#[derive(Serialize)]
struct FreeBusyItem<'a> {
    id: &'a str,
}

#[derive(Deserialize)]
struct FreeBusyResponse {
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyInterval>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Deserialize)]
struct FreeBusyError {
    reason: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
    time_zone: String,
}

#[derive(Serialize)]
struct EventAttendee<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct NewEvent<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<EventAttendee<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedEvent {
    id: String,
    html_link: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct EventItem {
    id: String,
    summary: Option<String>,
    start: EventTime,
    end: EventTime,
    attendees: Option<Vec<AttendeeItem>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<DateTime<FixedOffset>>,
    date: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct AttendeeItem {
    email: String,
}

impl EventTime {
    /// All day events only carry a date which starts at local
    /// midnight.
    fn resolve(&self, tz: Tz) -> Option<(DateTime<Utc>, bool)> {
        if let Some(dt) = self.date_time {
            return Some((dt.with_timezone(&Utc), false));
        }
        let midnight = self.date?.and_hms_opt(0, 0, 0)?;
        let local = tz.from_local_datetime(&midnight).earliest()?;
        Some((local.with_timezone(&Utc), true))
    }
}

fn unavailable(context: &str, err: impl std::fmt::Display) -> SchedulingError {
    SchedulingError::CalendarUnavailable(format!("{}: {}", context, err))
}

/// Talks to the Google Calendar REST API. Every call mints a new
/// access token from the credential file and nothing is cached.
pub struct GoogleCalendar {
    config: CalendarConfig,
    credentials: Credentials,
    client: Client,
}

impl GoogleCalendar {
    pub fn new(config: CalendarConfig) -> Result<Self> {
        let credentials = Credentials::from_file(&config.credentials_path)?;
        Ok(Self::with_credentials(config, credentials))
    }

    pub fn with_credentials(config: CalendarConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn events_url(&self, calendar_id: &str) -> String {
        self.url(&format!(
            "/calendars/{}/events",
            urlencoding::encode(calendar_id)
        ))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        context: &str,
        request: RequestBuilder,
    ) -> Result<T, SchedulingError> {
        let token = self
            .credentials
            .access_token()
            .await
            .map_err(|e| unavailable("authentication failed", e))?;
        let res = request
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| unavailable(context, e))?;
        let status = res.status();
        let text = res.text().await.map_err(|e| unavailable(context, e))?;
        if !status.is_success() {
            tracing::error!("{} failed: {} ({})", context, status, text);
            return Err(unavailable(context, format!("{} ({})", status, text)));
        }
        serde_json::from_str(&text).map_err(|e| unavailable(context, e))
    }

    /// Busy intervals for `calendar_id` between `start` and `end`.
    pub async fn query_free_busy(
        &self,
        calendar_id: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<BusyInterval>, SchedulingError> {
        ensure_range(&start, &end)?;

        let tz_name = self.config.timezone.name();
        let body = FreeBusyRequest {
            time_min: start.to_rfc3339(),
            time_max: end.to_rfc3339(),
            time_zone: tz_name,
            items: vec![FreeBusyItem { id: calendar_id }],
        };
        tracing::debug!(
            "Checking free/busy for {} from {} to {}",
            calendar_id,
            body.time_min,
            body.time_max
        );

        let request = self.client.post(self.url("/freeBusy")).json(&body);
        let mut resp: FreeBusyResponse = self.send("Free/busy query", request).await?;

        let calendar = resp.calendars.remove(calendar_id).ok_or_else(|| {
            SchedulingError::CalendarUnavailable(format!(
                "Calendar {} missing from free/busy response",
                calendar_id
            ))
        })?;
        if let Some(err) = calendar.errors.first() {
            return Err(SchedulingError::CalendarUnavailable(format!(
                "Free/busy query for {} failed: {}",
                calendar_id, err.reason
            )));
        }

        let mut busy = calendar.busy;
        busy.sort_by_key(|b| b.start);
        Ok(busy)
    }

    /// Create an event exactly as requested. Conflicts are not
    /// checked here.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        request: &BookingRequest,
    ) -> Result<BookingResult, SchedulingError> {
        ensure_range(&request.start, &request.end)?;

        let tz_name = request.timezone().name().to_string();
        let body = NewEvent {
            summary: &request.title,
            description: request.description.as_deref(),
            start: EventDateTime {
                date_time: request.start.to_rfc3339(),
                time_zone: tz_name.clone(),
            },
            end: EventDateTime {
                date_time: request.end.to_rfc3339(),
                time_zone: tz_name,
            },
            attendees: request
                .attendees
                .iter()
                .map(|email| EventAttendee { email })
                .collect(),
        };
        tracing::info!(
            "Creating event '{}' on {} from {} to {}",
            request.title,
            calendar_id,
            body.start.date_time,
            body.end.date_time
        );

        let http_request = self
            .client
            .post(self.events_url(calendar_id))
            .json(&body);
        let created: CreatedEvent = self.send("Event creation", http_request).await?;

        let confirmation_text = format!(
            "'{}' booked for {}",
            request.title,
            describe_span(&request.start, &request.end, request.timezone())
        );

        Ok(BookingResult {
            event_id: created.id,
            start: request.start,
            end: request.end,
            html_link: created.html_link,
            confirmation_text,
        })
    }

    pub async fn list_events_between(
        &self,
        calendar_id: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<CalendarEvent>, SchedulingError> {
        ensure_range(&start, &end)?;

        // Results are paged, follow `nextPageToken` until exhausted
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(self.events_url(calendar_id)).query(&[
                ("timeMin", start.to_rfc3339()),
                ("timeMax", end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: EventList = self.send("Event listing", request).await?;
            items.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let tz = self.config.timezone;
        let events = items
            .into_iter()
            .filter_map(|item| {
                let (start, all_day) = item.start.resolve(tz)?;
                let (end, _) = item.end.resolve(tz)?;
                Some(CalendarEvent {
                    id: item.id,
                    summary: item.summary.unwrap_or_else(|| "No title".to_string()),
                    start,
                    end,
                    all_day,
                    attendees: item
                        .attendees
                        .unwrap_or_default()
                        .into_iter()
                        .map(|a| a.email)
                        .collect(),
                })
            })
            .collect();

        Ok(events)
    }
}

#[async_trait]
impl Calendar for GoogleCalendar {
    async fn get_busy(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<BusyInterval>, SchedulingError> {
        self.query_free_busy(&self.config.calendar_id, query.start(), query.end())
            .await
    }

    async fn create_event(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingResult, SchedulingError> {
        self.insert_event(&self.config.calendar_id, request).await
    }

    async fn list_events(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<CalendarEvent>, SchedulingError> {
        self.list_events_between(&self.config.calendar_id, query.start(), query.end())
            .await
    }
}
