//! Page fetching
//!
//! Retrieves raw HTML for a URL with browser-like headers, host-specific
//! overrides and a logged one-shot TLS downgrade.

mod fetcher;
mod headers;

pub use fetcher::{build_http_client, is_certificate_error, PageFetcher};
pub use headers::{browser_headers, matches_host, HostRule, HostRules, BROWSER_USER_AGENT};
