use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied after parsing and before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use linkcal::config::load_config;
///
/// let config = load_config(Path::new("linkcal.toml")).unwrap();
/// println!("Bot talks to: {}", config.bot.api_url);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;

    Ok(config)
}

/// Builds a configuration from defaults and the process environment only
pub fn load_from_env() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Overlays environment variables onto a parsed configuration
///
/// | Variable | Setting |
/// |----------|---------|
/// | `API_URL` | `bot.api-url` (trailing `/` removed) |
/// | `ADMIN_USERNAMES` | `bot.admin-usernames` (comma-separated) |
/// | `TELEGRAM_BOT_TOKEN` | `bot.bot-token` |
/// | `ANTHROPIC_API_KEY` | `model.api-key` |
/// | `GOOGLE_CALENDAR_ID` | `calendar.calendar-id` |
/// | `LINKCAL_BIND` | `server.bind` |
///
/// Empty values are ignored. The lookup is injected so tests need not touch
/// the real process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(api_url) = get("API_URL") {
        config.bot.api_url = api_url.trim_end_matches('/').to_string();
    }

    if let Some(admins) = get("ADMIN_USERNAMES") {
        config.bot.admin_usernames = admins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
        config.bot.bot_token = Some(token);
    }

    if let Some(key) = get("ANTHROPIC_API_KEY") {
        config.model.api_key = Some(key);
    }

    if let Some(calendar_id) = get("GOOGLE_CALENDAR_ID") {
        config.calendar.calendar_id = calendar_id;
    }

    if let Some(bind) = get("LINKCAL_BIND") {
        config.server.bind = bind;
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two running processes can be checked for drift.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
