use serde::Deserialize;

/// Main configuration structure for Linkcal
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// usable configuration once secrets are supplied through the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

/// HTTP service settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the service listens on
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Page fetching behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Extra host-specific header rules, applied after the built-in ones
    #[serde(rename = "host-rules", default)]
    pub host_rules: Vec<HostRuleEntry>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            host_rules: Vec::new(),
        }
    }
}

/// Header overrides for one host pattern
#[derive(Debug, Clone, Deserialize)]
pub struct HostRuleEntry {
    /// Host pattern (e.g., "lu.ma" or "*.lu.ma")
    pub host: String,

    /// Header name/value pairs
    #[serde(default)]
    pub headers: std::collections::BTreeMap<String, String>,
}

/// Language model settings
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the Anthropic-compatible Messages API
    #[serde(rename = "api-base", default = "default_model_api_base")]
    pub api_base: String,

    /// API key; usually supplied through ANTHROPIC_API_KEY
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(rename = "max-output-tokens", default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_model_timeout")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: default_model_api_base(),
            api_key: None,
            name: default_model_name(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_model_timeout(),
        }
    }
}

/// Calendar provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Target calendar identifier
    #[serde(rename = "calendar-id", default = "default_calendar_id")]
    pub calendar_id: String,

    /// Timezone label applied to both start and end
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// JSON file holding the OAuth access token
    #[serde(rename = "token-path", default = "default_token_path")]
    pub token_path: String,

    /// Base URL of the Google Calendar v3 API
    #[serde(rename = "api-base", default = "default_calendar_api_base")]
    pub api_base: String,

    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_calendar_timeout")]
    pub timeout_secs: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: default_calendar_id(),
            timezone: default_timezone(),
            token_path: default_token_path(),
            api_base: default_calendar_api_base(),
            timeout_secs: default_calendar_timeout(),
        }
    }
}

/// Chat bot settings
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Base URL of the linkcal HTTP service
    #[serde(rename = "api-url", default = "default_api_url")]
    pub api_url: String,

    /// Telegram bot token; usually supplied through TELEGRAM_BOT_TOKEN
    #[serde(rename = "bot-token", default)]
    pub bot_token: Option<String>,

    /// Base URL of the Telegram Bot API
    #[serde(rename = "telegram-api-base", default = "default_telegram_api_base")]
    pub telegram_api_base: String,

    /// Usernames allowed to approve drafts
    #[serde(rename = "admin-usernames", default)]
    pub admin_usernames: Vec<String>,

    #[serde(rename = "approval-emoji", default = "default_approval_emoji")]
    pub approval_emoji: String,

    #[serde(rename = "ack-emoji", default = "default_ack_emoji")]
    pub ack_emoji: String,

    /// Tell the chat when a link could not be turned into a draft
    #[serde(rename = "notify-link-failures", default)]
    pub notify_link_failures: bool,

    /// Evict pending drafts older than this (seconds); unset keeps them forever
    #[serde(rename = "pending-ttl-secs", default)]
    pub pending_ttl_secs: Option<u64>,

    /// Long-poll timeout for getUpdates (seconds)
    #[serde(rename = "poll-timeout-secs", default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Timeout for calls to the linkcal service (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_bot_request_timeout")]
    pub request_timeout_secs: u64,

    /// Characters of description shown in the chat summary
    #[serde(rename = "summary-description-limit", default = "default_summary_limit")]
    pub summary_description_limit: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            bot_token: None,
            telegram_api_base: default_telegram_api_base(),
            admin_usernames: Vec::new(),
            approval_emoji: default_approval_emoji(),
            ack_emoji: default_ack_emoji(),
            notify_link_failures: false,
            pending_ttl_secs: None,
            poll_timeout_secs: default_poll_timeout(),
            request_timeout_secs: default_bot_request_timeout(),
            summary_description_limit: default_summary_limit(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_model_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model_name() -> String {
    "claude-3-5-sonnet-20240620".to_string()
}

fn default_max_output_tokens() -> u32 {
    5000
}

fn default_temperature() -> f32 {
    0.5
}

fn default_model_timeout() -> u64 {
    60
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_timezone() -> String {
    "America/Chicago".to_string()
}

fn default_token_path() -> String {
    "token.json".to_string()
}

fn default_calendar_api_base() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_calendar_timeout() -> u64 {
    30
}

fn default_api_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_approval_emoji() -> String {
    "👍".to_string()
}

fn default_ack_emoji() -> String {
    "👀".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_bot_request_timeout() -> u64 {
    90
}

fn default_summary_limit() -> usize {
    500
}
