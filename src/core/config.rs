use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono_tz::Tz;

use crate::calendar::WorkingHours;
use crate::google::CalendarConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub calendar_id: String,
    pub credentials_path: PathBuf,
    pub calendar_api_url: String,
    pub timezone: Tz,
    pub working_hours: WorkingHours,
    pub default_duration_minutes: i64,
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub openai_model: String,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup so it can be exercised
    /// without touching the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(anyhow!("Missing env var {}", key))
        };

        let calendar_id = require("BOOKER_CALENDAR_ID")?;
        let credentials_path = PathBuf::from(require("GOOGLE_APPLICATION_CREDENTIALS")?);
        let calendar_api_url = lookup("BOOKER_CALENDAR_API_URL")
            .unwrap_or_else(|| "https://www.googleapis.com/calendar/v3".to_string());
        let timezone: Tz = parse_or("BOOKER_TIMEZONE", lookup("BOOKER_TIMEZONE"), Tz::Asia__Kolkata)?;
        let start_hour: u32 = parse_or("BOOKER_WORKDAY_START", lookup("BOOKER_WORKDAY_START"), 9)?;
        let end_hour: u32 = parse_or("BOOKER_WORKDAY_END", lookup("BOOKER_WORKDAY_END"), 18)?;
        let working_hours = WorkingHours::new(start_hour, end_hour).ok_or(anyhow!(
            "Invalid working hours {}..{}: start must be before end and end at most 24",
            start_hour,
            end_hour
        ))?;
        let default_duration_minutes: i64 = parse_or(
            "BOOKER_DEFAULT_DURATION_MINUTES",
            lookup("BOOKER_DEFAULT_DURATION_MINUTES"),
            60,
        )?;
        if default_duration_minutes <= 0 {
            return Err(anyhow!(
                "BOOKER_DEFAULT_DURATION_MINUTES must be positive, got {}",
                default_duration_minutes
            ));
        }
        let openai_api_hostname =
            lookup("BOOKER_LLM_HOST").unwrap_or_else(|| "https://api.openai.com".to_string());
        let openai_api_key =
            lookup("OPENAI_API_KEY").unwrap_or_else(|| "thiswontworkforopenai".to_string());
        let openai_model =
            lookup("BOOKER_LLM_MODEL").unwrap_or_else(|| "gpt-4.1-mini".to_string());

        Ok(Self {
            calendar_id,
            credentials_path,
            calendar_api_url,
            timezone,
            working_hours,
            default_duration_minutes,
            openai_api_hostname,
            openai_api_key,
            openai_model,
        })
    }

    pub fn calendar_config(&self) -> CalendarConfig {
        CalendarConfig {
            calendar_id: self.calendar_id.clone(),
            credentials_path: self.credentials_path.clone(),
            api_base_url: self.calendar_api_url.clone(),
            timezone: self.timezone,
        }
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", key, v, e)),
        None => Ok(default),
    }
}
