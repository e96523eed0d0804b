//! Calendar publishing
//!
//! Maps an approved draft onto the provider's event shape and commits it.
//! Every event gets the same configured timezone label; per-event timezone
//! detection is not attempted.

mod google;

pub use google::{GoogleCalendarPublisher, StoredToken, GOOGLE_TOKEN_URI};

use crate::draft::EventDraft;
use crate::PublishError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Something that can put an event on a calendar
#[async_trait]
pub trait CalendarPublisher: Send + Sync {
    /// Publishes the draft and returns the provider's event identifier
    async fn publish(&self, draft: &EventDraft) -> Result<String, PublishError>;
}

/// Start or end of a provider event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: String,
    pub time_zone: String,
}

/// Event body in the Google Calendar v3 shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventPayload {
    pub summary: String,
    pub location: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
}

impl CalendarEventPayload {
    /// Maps draft fields onto the provider shape
    pub fn from_draft(draft: &EventDraft, timezone: &str) -> Self {
        Self {
            summary: draft.title.clone(),
            location: draft.location.clone(),
            description: draft.description.clone(),
            start: EventTime {
                date_time: draft.start_time.clone(),
                time_zone: timezone.to_string(),
            },
            end: EventTime {
                date_time: draft.end_time.clone(),
                time_zone: timezone.to_string(),
            },
        }
    }
}
