use crate::ai::SchedulingAgent;
use crate::calendar::SharedCalendar;
use crate::core::AppConfig;

/// Read-only state shared by every request. Nothing here is mutated
/// after startup so it lives behind a plain `Arc`.
pub struct AppState {
    pub config: AppConfig,
    pub calendar: SharedCalendar,
    pub agent: SchedulingAgent,
}

impl AppState {
    pub fn new(config: AppConfig, calendar: SharedCalendar) -> Self {
        let agent = SchedulingAgent::from_config(&config, calendar.clone());
        Self::with_agent(config, calendar, agent)
    }

    pub fn with_agent(config: AppConfig, calendar: SharedCalendar, agent: SchedulingAgent) -> Self {
        Self {
            config,
            calendar,
            agent,
        }
    }
}
