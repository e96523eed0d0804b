//! Linkcal: turn event links into calendar entries
//!
//! This crate fetches a web page, flattens it to text, asks a language model
//! for a structured event, validates the result and, after an admin approves
//! the draft in a chat, publishes it to a shared calendar.

pub mod approval;
pub mod bot;
pub mod calendar;
pub mod config;
pub mod draft;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod server;
pub mod validate;

use thiserror::Error;

/// Errors produced while retrieving a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status} {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Failed to read body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// The language model could not be invoked or returned nothing usable
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Model returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Model response had no text content")]
    EmptyResponse,

    #[error("Model API key is not configured")]
    MissingApiKey,
}

/// Model output that could not be decoded into a JSON object after sanitization
#[derive(Debug, Error)]
#[error("Invalid JSON response from AI: {message}")]
pub struct MalformedResponse {
    pub message: String,
    pub raw_response: String,
    pub cleaned_response: String,
}

/// Structural or datetime problems that make a draft unusable
#[derive(Debug, Error)]
#[error("Event validation failed: {}", issues.join("; "))]
pub struct ValidationFailure {
    pub issues: Vec<String>,
    pub parsed: serde_json::Value,
}

/// Errors from the calendar provider
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Calendar request failed: {0}")]
    Transport(String),

    #[error("Calendar provider returned HTTP {status}: {detail}")]
    Provider { status: u16, detail: String },

    #[error("Calendar provider response was missing an event id")]
    MissingEventId,

    #[error("Calendar token refresh failed: {0}")]
    TokenRefresh(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),

    #[error("Missing required setting: {0}")]
    Missing(String),
}

/// Umbrella error for the extraction pipeline and the HTTP service
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Malformed(#[from] MalformedResponse),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

// Re-export commonly used types
pub use approval::{ApprovalState, ApprovalWorkflow, InMemoryPendingStore, PendingStore};
pub use config::Config;
pub use draft::EventDraft;
pub use extract::DescriptionStyle;
pub use validate::{validate, Candidate, ValidationResult};
