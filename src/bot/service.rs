//! HTTP client for the extraction service

use crate::approval::{EventService, ServiceError};
use crate::config::BotConfig;
use crate::draft::{EventDraft, ParsedEvent};
use crate::extract::DescriptionStyle;
use crate::server::CreatedEvent;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Error body returned by the service
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    details: Option<String>,
    #[serde(default)]
    issues: Vec<String>,
}

/// Calls `/parse-event` and `/create-event` on a running `linkcal serve`
#[derive(Debug, Clone)]
pub struct HttpEventService {
    client: Client,
    base_url: String,
}

impl HttpEventService {
    pub fn new(config: &BotConfig) -> Result<Self, ConfigError> {
        Url::parse(&config.api_url).map_err(|e| ConfigError::InvalidUrl(format!("bot.api-url: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::Validation(format!("Failed to build service client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: DeserializeOwned>(&self, route: &str, body: &serde_json::Value) -> Result<T, ServiceError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, route))
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

async fn rejection(response: Response) -> ServiceError {
    let status = response.status();
    let body: ErrorResponse = response.json().await.unwrap_or_default();

    let details = body
        .details
        .or_else(|| (!body.issues.is_empty()).then(|| body.issues.join("; ")));

    ServiceError::Rejected {
        status: status.as_u16(),
        error: body
            .error
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string()),
        details,
    }
}

#[async_trait]
impl EventService for HttpEventService {
    async fn parse_event(&self, url: &str, style: DescriptionStyle) -> Result<ParsedEvent, ServiceError> {
        let body = json!({
            "url": url,
            "description_style": style.as_str(),
        });
        self.post("/parse-event", &body).await
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<String, ServiceError> {
        let body = serde_json::to_value(draft).map_err(|e| ServiceError::Decode(e.to_string()))?;
        let created: CreatedEvent = self.post("/create-event", &body).await?;
        Ok(created.event_id)
    }
}
