//! Collaborators the approval workflow talks to
//!
//! The chat platform and the HTTP service sit behind these traits so the
//! workflow can be driven by test doubles.

use crate::approval::store::{ChatId, MessageKey};
use crate::draft::{EventDraft, ParsedEvent};
use crate::extract::DescriptionStyle;
use async_trait::async_trait;
use thiserror::Error;

/// Chat transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Chat request failed: {0}")]
    Request(String),

    #[error("Chat API rejected {method}: {description}")]
    Api { method: String, description: String },

    #[error("Unexpected chat API response: {0}")]
    Decode(String),
}

/// Errors from the extraction/publish service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service request failed: {0}")]
    Request(String),

    /// The service answered with an error body
    #[error("{}", rejection_text(.status, .error, .details))]
    Rejected {
        status: u16,
        error: String,
        details: Option<String>,
    },

    #[error("Unexpected service response: {0}")]
    Decode(String),
}

fn rejection_text(status: &u16, error: &str, details: &Option<String>) -> String {
    match details {
        Some(details) => format!("{} ({}): {}", error, status, details),
        None => format!("{} ({})", error, status),
    }
}

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Posts `text` to `chat_id`, optionally as a reply, and returns the key
    /// of the new message
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<MessageKey, TransportError>;

    /// Sets the bot's reaction on a message
    async fn set_reaction(&self, message: MessageKey, emoji: &str) -> Result<(), TransportError>;
}

/// The extraction and publishing service
#[async_trait]
pub trait EventService: Send + Sync {
    async fn parse_event(&self, url: &str, style: DescriptionStyle) -> Result<ParsedEvent, ServiceError>;

    /// Publishes a draft, returning the calendar event id
    async fn create_event(&self, draft: &EventDraft) -> Result<String, ServiceError>;
}
