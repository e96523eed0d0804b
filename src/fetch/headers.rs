//! Request headers for page fetching
//!
//! Pages are requested with a header set that looks like a desktop browser.
//! A few sites additionally expect headers of their own; those live in a
//! small `host -> overrides` table so the fetcher itself stays site-agnostic.

use crate::config::HostRuleEntry;
use crate::ConfigError;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

/// Desktop Chrome user agent sent with every page request
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Builds the fixed browser-like header set
///
/// `Accept-Encoding` is left to reqwest, which only decodes what it advertised.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-user"),
        HeaderValue::from_static("?1"),
    );
    headers
}

/// Header overrides for hosts matching one pattern
#[derive(Debug, Clone)]
pub struct HostRule {
    /// Exact host or `*.domain` wildcard
    pub pattern: String,
    pub headers: HeaderMap,
}

impl HostRule {
    /// Returns true if this rule applies to `host`
    pub fn matches(&self, host: &str) -> bool {
        matches_host(&self.pattern, host)
    }
}

/// Ordered table of host rules; later rules override earlier ones
#[derive(Debug, Clone, Default)]
pub struct HostRules {
    rules: Vec<HostRule>,
}

impl HostRules {
    /// The rules shipped with linkcal
    ///
    /// lu.ma rejects page requests that do not look like they came from its
    /// own front end.
    pub fn builtin() -> Self {
        let mut luma = HeaderMap::new();
        luma.insert(
            reqwest::header::ORIGIN,
            HeaderValue::from_static("https://lu.ma"),
        );
        luma.insert(
            reqwest::header::REFERER,
            HeaderValue::from_static("https://lu.ma/"),
        );

        Self {
            rules: vec![HostRule {
                pattern: "*.lu.ma".to_string(),
                headers: luma,
            }],
        }
    }

    /// Built-in rules followed by the configured ones
    pub fn from_config(entries: &[HostRuleEntry]) -> Result<Self, ConfigError> {
        let mut rules = Self::builtin();
        for entry in entries {
            rules.push(parse_entry(entry)?);
        }
        Ok(rules)
    }

    pub fn push(&mut self, rule: HostRule) {
        self.rules.push(rule);
    }

    /// Collects the overrides for `host`; empty when no rule matches
    pub fn headers_for(&self, host: &str) -> HeaderMap {
        let host = host.to_ascii_lowercase();
        let mut headers = HeaderMap::new();
        for rule in self.rules.iter().filter(|r| r.matches(&host)) {
            for (name, value) in &rule.headers {
                headers.insert(name.clone(), value.clone());
            }
        }
        headers
    }
}

fn parse_entry(entry: &HostRuleEntry) -> Result<HostRule, ConfigError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &entry.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConfigError::Validation(format!("Invalid header name '{}' for {}: {}", name, entry.host, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ConfigError::Validation(format!("Invalid header value for {}: {}", entry.host, e))
        })?;
        headers.insert(name, value);
    }

    Ok(HostRule {
        pattern: entry.host.to_ascii_lowercase(),
        headers,
    })
}

/// Checks if a host matches a pattern
///
/// `"*.lu.ma"` matches `lu.ma` itself and any subdomain; anything else is an
/// exact comparison.
///
/// ```
/// use linkcal::fetch::matches_host;
///
/// assert!(matches_host("*.lu.ma", "lu.ma"));
/// assert!(matches_host("*.lu.ma", "api.lu.ma"));
/// assert!(!matches_host("*.lu.ma", "plu.ma"));
/// assert!(matches_host("example.com", "example.com"));
/// ```
pub fn matches_host(pattern: &str, host: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        host == base || host.ends_with(&format!(".{}", base))
    } else {
        host == pattern
    }
}
