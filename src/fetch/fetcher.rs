//! HTTP page fetcher
//!
//! This module handles retrieving raw page content, including:
//! - Building clients with browser-like default headers
//! - Applying host-specific header overrides
//! - A single retry without certificate validation on TLS failures
//! - Mapping non-success statuses to `FetchError::Status`

use crate::config::FetchConfig;
use crate::fetch::headers::{browser_headers, HostRules};
use crate::{FetchError, PipelineError};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

/// Retrieves pages for extraction
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    insecure_client: Client,
    rules: HostRules,
}

impl PageFetcher {
    /// Creates a fetcher from configuration
    ///
    /// Both the verifying and the non-verifying client are built up front so a
    /// TLS downgrade never fails on client construction.
    pub fn new(config: &FetchConfig) -> Result<Self, PipelineError> {
        let rules = HostRules::from_config(&config.host_rules)?;
        let client = build_http_client(config, false)?;
        let insecure_client = build_http_client(config, true)?;
        tracing::debug!(configured_host_rules = config.host_rules.len(), "Page fetcher ready");

        Ok(Self {
            client,
            insecure_client,
            rules,
        })
    }

    /// Fetches a page and returns its body as text
    ///
    /// # Request Flow
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | body returned |
    /// | non-2xx | `FetchError::Status` with status and reason |
    /// | certificate failure | logged, retried once without verification |
    /// | any other transport failure | `FetchError::Transport` |
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let overrides = parsed
            .host_str()
            .map(|host| self.rules.headers_for(host))
            .unwrap_or_default();

        tracing::info!(url = %url, overrides = overrides.len(), "Fetching page");

        let response = match send(&self.client, &parsed, &overrides).await {
            Ok(response) => response,
            Err(e) if is_certificate_error(&e) => {
                tracing::warn!(
                    url = %url,
                    error = %error_chain(&e),
                    "Certificate validation failed; retrying once WITHOUT certificate verification"
                );
                send(&self.insecure_client, &parsed, &overrides)
                    .await
                    .map_err(|e| FetchError::Transport {
                        url: url.to_string(),
                        message: error_chain(&e),
                    })?
            }
            Err(e) => {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    message: error_chain(&e),
                })
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

async fn send(client: &Client, url: &Url, overrides: &HeaderMap) -> Result<Response, reqwest::Error> {
    client
        .get(url.clone())
        .headers(overrides.clone())
        .send()
        .await
}

/// Builds an HTTP client for page fetching
///
/// # Arguments
///
/// * `config` - Fetch timeouts
/// * `accept_invalid_certs` - Disable certificate validation (fallback client only)
pub fn build_http_client(config: &FetchConfig, accept_invalid_certs: bool) -> Result<Client, FetchError> {
    Client::builder()
        .default_headers(browser_headers())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}

/// Returns true if the error chain points at certificate validation
///
/// reqwest does not expose TLS failures as a distinct kind, so the source
/// chain is inspected for the diagnostics rustls produces.
pub fn is_certificate_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        let message = e.to_string().to_ascii_lowercase();
        if message.contains("certificate")
            || message.contains("unknownissuer")
            || message.contains("unknown issuer")
            || message.contains("self signed")
            || message.contains("self-signed")
        {
            return true;
        }
        current = e.source();
    }
    false
}

/// Flattens an error and its sources into one line
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}
