use crate::config::types::{BotConfig, CalendarConfig, Config, FetchConfig, ModelConfig};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// One year
const MAX_PENDING_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_bind(&config.server.bind)?;
    validate_fetch_config(&config.fetch)?;
    validate_model_config(&config.model)?;
    validate_calendar_config(&config.calendar)?;
    validate_bot_config(&config.bot)?;
    Ok(())
}

fn validate_server_bind(bind: &str) -> Result<(), ConfigError> {
    bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("server bind '{}' is not a socket address: {}", bind, e))
    })?;
    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 || config.connect_timeout_secs > config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "fetch connect-timeout-secs must be between 1 and {}, got {}",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    for rule in &config.host_rules {
        validate_host_pattern(&rule.host)?;

        if rule.headers.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Host rule '{}' must set at least one header",
                rule.host
            )));
        }
    }

    Ok(())
}

/// Validates model configuration
fn validate_model_config(config: &ModelConfig) -> Result<(), ConfigError> {
    validate_http_url("model api-base", &config.api_base)?;

    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation("model name cannot be empty".to_string()));
    }

    if config.max_output_tokens < 1 {
        return Err(ConfigError::Validation(
            "model max-output-tokens must be >= 1".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "model temperature must be between 0.0 and 1.0, got {}",
            config.temperature
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "model timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates calendar configuration
fn validate_calendar_config(config: &CalendarConfig) -> Result<(), ConfigError> {
    validate_http_url("calendar api-base", &config.api_base)?;

    if config.calendar_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "calendar-id cannot be empty".to_string(),
        ));
    }

    // IANA names look like Area/City; "UTC" is the one common exception
    if config.timezone != "UTC" && !config.timezone.contains('/') {
        return Err(ConfigError::Validation(format!(
            "calendar timezone '{}' is not an IANA timezone name",
            config.timezone
        )));
    }

    if config.token_path.is_empty() {
        return Err(ConfigError::Validation(
            "calendar token-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates bot configuration
fn validate_bot_config(config: &BotConfig) -> Result<(), ConfigError> {
    validate_http_url("bot api-url", &config.api_url)?;
    validate_http_url("bot telegram-api-base", &config.telegram_api_base)?;

    if config.approval_emoji.trim().is_empty() || config.ack_emoji.trim().is_empty() {
        return Err(ConfigError::Validation(
            "approval-emoji and ack-emoji cannot be empty".to_string(),
        ));
    }

    for name in &config.admin_usernames {
        if name.trim().trim_start_matches('@').is_empty() {
            return Err(ConfigError::Validation(
                "admin-usernames cannot contain empty entries".to_string(),
            ));
        }
    }

    if let Some(ttl) = config.pending_ttl_secs {
        if !(1..=MAX_PENDING_TTL_SECS).contains(&ttl) {
            return Err(ConfigError::Validation(format!(
                "pending-ttl-secs must be between 1 and {} when set",
                MAX_PENDING_TTL_SECS
            )));
        }
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "bot request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

/// Validates a host pattern (supports a leading `*.` wildcard)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(host) => validate_host_string(host),
        None => validate_host_string(pattern),
    }
}

/// Validates a host string (without wildcard prefix)
fn validate_host_string(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::InvalidPattern("Host cannot be empty".to_string()));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot contain consecutive dots",
            host
        )));
    }

    Ok(())
}
