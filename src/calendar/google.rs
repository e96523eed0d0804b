//! Google Calendar v3 publisher
//!
//! The OAuth consent flow is handled outside linkcal; this module reads the
//! resulting token file and keeps the access token fresh with the refresh
//! token stored alongside it.

use crate::calendar::{CalendarEventPayload, CalendarPublisher};
use crate::config::CalendarConfig;
use crate::draft::EventDraft;
use crate::{ConfigError, PublishError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Google's OAuth 2.0 token endpoint
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Access tokens this close to expiry are refreshed before use
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// Token file written by the OAuth bootstrap
///
/// Accepts both `access_token`/`expires_at` and the `token`/`expiry` keys
/// Google's client libraries write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default, alias = "expiry", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// A bare access token with no expiry and no way to refresh it
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            client_id: None,
            client_secret: None,
            token_uri: default_token_uri(),
            expires_at: None,
        }
    }

    /// Reads the token file; `Ok(None)` when it does not exist
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let token: StoredToken = serde_json::from_str(&content).map_err(|e| {
            ConfigError::Validation(format!("Invalid token file {}: {}", path.display(), e))
        })?;

        if token.access_token.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Token file {} has an empty access_token",
                path.display()
            )));
        }

        Ok(Some(token))
    }

    /// Writes the token back so restarts and other processes see it
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
    }

    /// True once the access token is expired or about to expire
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now + chrono::Duration::seconds(EXPIRY_MARGIN_SECS))
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some()
    }
}

/// Token endpoint reply to a refresh grant
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    id: Option<String>,
}

/// Publishes events through the Google Calendar REST API
#[derive(Debug)]
pub struct GoogleCalendarPublisher {
    client: Client,
    events_url: Url,
    token: Mutex<StoredToken>,
    token_path: Option<PathBuf>,
    timezone: String,
}

impl GoogleCalendarPublisher {
    pub fn new(config: &CalendarConfig, token: StoredToken) -> Result<Self, ConfigError> {
        let mut events_url = Url::parse(&config.api_base)
            .map_err(|e| ConfigError::InvalidUrl(format!("calendar api-base: {}", e)))?;

        events_url
            .path_segments_mut()
            .map_err(|_| ConfigError::InvalidUrl("calendar api-base cannot be a base".to_string()))?
            .pop_if_empty()
            .push("calendars")
            .push(&config.calendar_id)
            .push("events");

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Validation(format!("calendar HTTP client: {}", e)))?;

        Ok(Self {
            client,
            events_url,
            token: Mutex::new(token),
            token_path: None,
            timezone: config.timezone.clone(),
        })
    }

    /// Keeps the token in sync with a file on disk
    ///
    /// An expired token is first re-read from the file, and refreshed tokens
    /// are written back to it.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    /// Builds a publisher when the token file exists
    ///
    /// A missing token file is not an error: the service still runs and
    /// `/create-event` reports that the calendar is not configured.
    pub fn from_config(config: &CalendarConfig) -> Result<Option<Self>, ConfigError> {
        let path = Path::new(&config.token_path);
        match StoredToken::load(path)? {
            Some(token) => {
                if !token.can_refresh() {
                    tracing::warn!(
                        token_path = %config.token_path,
                        "Calendar token has no refresh credentials; it cannot be renewed"
                    );
                }
                Ok(Some(Self::new(config, token)?.with_token_path(path)))
            }
            None => {
                tracing::warn!(
                    token_path = %config.token_path,
                    "Calendar token not found; publishing is disabled"
                );
                Ok(None)
            }
        }
    }

    pub fn events_url(&self) -> &Url {
        &self.events_url
    }

    /// Current access token, renewed first when it has expired
    async fn access_token(&self) -> Result<String, PublishError> {
        let mut token = self.token.lock().await;

        if token.is_expired(Utc::now()) {
            self.reload(&mut token);
        }
        if token.is_expired(Utc::now()) && token.can_refresh() {
            self.refresh(&mut token).await?;
        }

        Ok(token.access_token.clone())
    }

    /// Picks up a token another process wrote to the token file
    fn reload(&self, token: &mut StoredToken) {
        let Some(path) = &self.token_path else {
            return;
        };
        match StoredToken::load(path) {
            Ok(Some(on_disk)) if on_disk != *token => {
                tracing::debug!(token_path = %path.display(), "Reloaded calendar token from disk");
                *token = on_disk;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to re-read calendar token"),
        }
    }

    /// Exchanges the refresh token for a new access token
    async fn refresh(&self, token: &mut StoredToken) -> Result<(), PublishError> {
        let (Some(refresh_token), Some(client_id)) = (&token.refresh_token, &token.client_id) else {
            return Err(PublishError::TokenRefresh("no refresh token available".to_string()));
        };

        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("client_id", client_id.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];
        if let Some(secret) = &token.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        tracing::info!("Refreshing calendar access token");
        let response = self
            .client
            .post(&token.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| PublishError::TokenRefresh(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PublishError::TokenRefresh(format!("HTTP {}: {}", status.as_u16(), detail)));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| PublishError::TokenRefresh(format!("invalid response body: {}", e)))?;

        token.access_token = refreshed.access_token;
        token.expires_at = refreshed
            .expires_in
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));
        if let Some(rotated) = refreshed.refresh_token {
            token.refresh_token = Some(rotated);
        }

        if let Some(path) = &self.token_path {
            if let Err(e) = token.save(path) {
                tracing::warn!(token_path = %path.display(), error = %e, "Failed to persist refreshed token");
            }
        }
        Ok(())
    }

    async fn send(&self, payload: &CalendarEventPayload, access_token: &str) -> Result<Response, PublishError> {
        self.client
            .post(self.events_url.clone())
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}

#[async_trait]
impl CalendarPublisher for GoogleCalendarPublisher {
    async fn publish(&self, draft: &EventDraft) -> Result<String, PublishError> {
        let payload = CalendarEventPayload::from_draft(draft, &self.timezone);

        tracing::info!(title = %draft.title, "Publishing event to calendar");

        let access_token = self.access_token().await?;
        let mut response = self.send(&payload, &access_token).await?;

        // Revoked or expired early: renew once and retry
        if response.status() == StatusCode::UNAUTHORIZED {
            let mut token = self.token.lock().await;
            if token.can_refresh() {
                tracing::warn!("Calendar rejected the access token, refreshing");
                self.refresh(&mut token).await?;
                let access_token = token.access_token.clone();
                drop(token);
                response = self.send(&payload, &access_token).await?;
            }
        }

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), detail = %detail, "Calendar rejected event");
            return Err(PublishError::Provider {
                status: status.as_u16(),
                detail,
            });
        }

        let inserted: InsertedEvent = response
            .json()
            .await
            .map_err(|e| PublishError::Transport(format!("invalid response body: {}", e)))?;

        let id = inserted.id.ok_or(PublishError::MissingEventId)?;
        tracing::info!(event_id = %id, "Event published");
        Ok(id)
    }
}
