//! Application state shared across handlers

use crate::calendar::{CalendarPublisher, GoogleCalendarPublisher};
use crate::config::Config;
use crate::pipeline::EventPipeline;
use crate::PipelineError;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Fetch-to-validation pipeline
    pub pipeline: Arc<EventPipeline>,
    /// Calendar publisher; `None` when no credentials were found
    pub publisher: Option<Arc<dyn CalendarPublisher>>,
}

impl AppState {
    pub fn new(pipeline: EventPipeline, publisher: Option<Arc<dyn CalendarPublisher>>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            publisher,
        }
    }

    /// Builds the production state: Anthropic model and Google Calendar
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let pipeline = EventPipeline::from_config(config)?;
        let publisher = GoogleCalendarPublisher::from_config(&config.calendar)?
            .map(|p| Arc::new(p) as Arc<dyn CalendarPublisher>);
        Ok(Self::new(pipeline, publisher))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .field("calendar_configured", &self.publisher.is_some())
            .finish()
    }
}
