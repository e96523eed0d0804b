//! Telegram Bot API transport
//!
//! Long-polls `getUpdates` and sends messages and reactions over plain
//! HTTPS calls to `{api_base}/bot{token}/{method}`.

use crate::approval::{ChatEvent, ChatId, ChatTransport, IncomingMessage, MessageKey, ReactionEvent, TransportError};
use crate::config::BotConfig;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Update kinds the bot subscribes to
pub const ALLOWED_UPDATES: [&str; 2] = ["message", "message_reaction"];

/// Every Bot API response is wrapped in this envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub message_reaction: Option<MessageReactionUpdated>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageReactionUpdated {
    pub chat: Chat,
    pub message_id: i64,
    /// Absent for anonymous reactions
    pub user: Option<User>,
    #[serde(default)]
    pub new_reaction: Vec<ReactionType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactionType {
    Emoji {
        emoji: String,
    },
    /// Custom and paid reactions
    #[serde(other)]
    Other,
}

impl Update {
    /// Converts the update into something the workflow handles
    ///
    /// Returns `None` for updates without text, messages from bots and
    /// update kinds the workflow does not care about.
    pub fn into_event(self) -> Option<ChatEvent> {
        if let Some(message) = self.message {
            let from = message.from.as_ref();
            if from.is_some_and(|user| user.is_bot) {
                return None;
            }
            let text = message.text?;
            return Some(ChatEvent::Message(IncomingMessage {
                message: MessageKey::new(message.chat.id, message.message_id),
                text,
                sender: from.and_then(|user| user.username.clone()),
            }));
        }

        let reaction = self.message_reaction?;
        let emojis = reaction
            .new_reaction
            .into_iter()
            .filter_map(|r| match r {
                ReactionType::Emoji { emoji } => Some(emoji),
                ReactionType::Other => None,
            })
            .collect();
        Some(ChatEvent::Reaction(ReactionEvent {
            message: MessageKey::new(reaction.chat.id, reaction.message_id),
            actor: reaction.user.and_then(|user| user.username),
            emojis,
        }))
    }
}

/// Bot API client
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    client: Client,
    /// `{api_base}/bot{token}`; never logged
    base_url: String,
    poll_timeout_secs: u64,
}

impl TelegramTransport {
    pub fn new(config: &BotConfig) -> Result<Self, ConfigError> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing("bot.bot-token (TELEGRAM_BOT_TOKEN)".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::Validation(format!("Failed to build Telegram client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.telegram_api_base.trim_end_matches('/'), token),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    /// Long-polls for updates after `offset`
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
        let body = json!({
            "offset": offset,
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ALLOWED_UPDATES,
        });
        // The long poll must be allowed to outlast the server-side timeout
        let timeout = Duration::from_secs(self.poll_timeout_secs + 10);
        self.call("getUpdates", &body, Some(timeout)).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T, TransportError> {
        let mut request = self.client.post(format!("{}/{}", self.base_url, method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // Errors carry the URL, which contains the token
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.without_url().to_string()))?;

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.without_url().to_string()))?;

        if !envelope.ok {
            return Err(TransportError::Api {
                method: method.to_string(),
                description: envelope.description.unwrap_or_else(|| "no description".to_string()),
            });
        }

        envelope
            .result
            .ok_or_else(|| TransportError::Decode(format!("{} returned no result", method)))
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<MessageKey, TransportError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(message_id) = reply_to {
            body["reply_parameters"] = json!({
                "message_id": message_id,
                "allow_sending_without_reply": true,
            });
        }

        let sent: Message = self.call("sendMessage", &body, None).await?;
        Ok(MessageKey::new(sent.chat.id, sent.message_id))
    }

    async fn set_reaction(&self, message: MessageKey, emoji: &str) -> Result<(), TransportError> {
        let body = json!({
            "chat_id": message.chat_id,
            "message_id": message.message_id,
            "reaction": [ReactionType::Emoji { emoji: emoji.to_string() }],
        });
        let _: bool = self.call("setMessageReaction", &body, None).await?;
        Ok(())
    }
}
