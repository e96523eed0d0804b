//! Request handlers

use crate::draft::{EventDraft, ParsedEvent};
use crate::extract::DescriptionStyle;
use crate::server::error::ApiError;
use crate::server::extract::ApiJson;
use crate::server::state::AppState;
use crate::validate::{validate, Candidate};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body of `POST /parse-event`
#[derive(Debug, Deserialize)]
pub struct ParseEventRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description_style: Option<String>,
}

/// Body of a successful `POST /create-event`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedEvent {
    #[serde(rename = "eventId")]
    pub event_id: String,
}

/// Extracts an event from a URL
///
/// POST /parse-event
pub async fn parse_event(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ParseEventRequest>,
) -> Result<Json<ParsedEvent>, ApiError> {
    let url = request
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or(ApiError::MissingUrl)?;

    let style = DescriptionStyle::parse_lenient(request.description_style.as_deref());
    tracing::info!(url = %url, style = %style, "parse-event request");

    let parsed = state.pipeline.parse_event(&url, style).await?;
    Ok(Json(parsed))
}

/// Publishes a draft to the calendar
///
/// POST /create-event
pub async fn create_event(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<CreatedEvent>, ApiError> {
    let result = validate(Candidate::Value(&body));
    if !result.is_valid() {
        return Err(ApiError::InvalidEvent(result.errors));
    }

    let Some(publisher) = state.publisher.as_ref() else {
        return Err(ApiError::CalendarNotConfigured);
    };

    let Some(object) = body.as_object() else {
        return Err(ApiError::InvalidEvent(vec!["Expected a JSON object".to_string()]));
    };

    let draft = EventDraft::from_object(object);
    let event_id = publisher
        .publish(&draft)
        .await
        .map_err(|e| ApiError::Pipeline(e.into()))?;

    Ok(Json(CreatedEvent { event_id }))
}

/// Liveness and calendar availability
///
/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "calendar_configured": state.publisher.is_some(),
    }))
}
