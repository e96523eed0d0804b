//! API error handling
//!
//! Maps pipeline and publishing failures onto the status codes and JSON
//! bodies clients of `/parse-event` and `/create-event` rely on.

use crate::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Request body was not JSON of the expected shape
    InvalidBody { status: StatusCode, details: String },

    /// Request body had no usable URL
    MissingUrl,

    /// A submitted event failed validation
    InvalidEvent(Vec<String>),

    /// No calendar credentials were available at startup
    CalendarNotConfigured,

    /// Any pipeline or publishing failure
    Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(err)
    }
}

/// Error response body
#[derive(Debug, Default, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_details: Option<Value>,
}

impl ErrorBody {
    fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            ..Self::default()
        }
    }

    fn with_details(error: &str, details: impl ToString) -> Self {
        Self {
            error: error.to_string(),
            details: Some(details.to_string()),
            ..Self::default()
        }
    }
}

impl ApiError {
    /// Status code and body for this error
    pub fn parts(self) -> (StatusCode, ErrorBody) {
        match self {
            Self::InvalidBody { status, details } => {
                (status, ErrorBody::with_details("Invalid request body", details))
            }
            Self::MissingUrl => (StatusCode::BAD_REQUEST, ErrorBody::new("URL is required")),
            Self::InvalidEvent(issues) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    issues: Some(issues),
                    ..ErrorBody::new("Invalid event details")
                },
            ),
            Self::CalendarNotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Calendar is not configured"),
            ),
            Self::Pipeline(err) => pipeline_parts(err),
        }
    }
}

fn pipeline_parts(err: PipelineError) -> (StatusCode, ErrorBody) {
    match err {
        PipelineError::Fetch(e) => (
            StatusCode::BAD_REQUEST,
            ErrorBody::with_details("Failed to fetch webpage", e),
        ),
        PipelineError::Extraction(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::with_details("Failed to parse event details", e),
        ),
        PipelineError::Malformed(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorBody {
                details: Some(e.message),
                raw_response: Some(e.raw_response),
                cleaned_response: Some(e.cleaned_response),
                ..ErrorBody::new("Invalid JSON response from AI")
            },
        ),
        PipelineError::Validation(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorBody {
                issues: Some(e.issues),
                parsed_details: Some(e.parsed),
                ..ErrorBody::new("Event parsing issues detected")
            },
        ),
        PipelineError::Publish(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::with_details("Failed to create calendar event", e),
        ),
        PipelineError::Config(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::with_details("Service is misconfigured", e),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %body.error, details = ?body.details, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %body.error, "Request rejected");
        }
        (status, Json(body)).into_response()
    }
}
