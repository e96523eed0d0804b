//! The approval workflow
//!
//! Turns chat messages containing links into posted drafts, and admin
//! reactions on those drafts into calendar events.

use crate::approval::links::find_first_url;
use crate::approval::ports::{ChatTransport, EventService};
use crate::approval::state::ApprovalState;
use crate::approval::store::{ChatId, MessageKey, PendingApproval, PendingStore};
use crate::config::BotConfig;
use crate::draft::ParsedEvent;
use crate::extract::DescriptionStyle;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub const GREETING: &str = "Hi! Send me an event link and I'll parse it for you!";

/// Usernames allowed to approve drafts
///
/// Matching ignores case and a leading `@`.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    names: HashSet<String>,
}

impl AdminAllowlist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| normalize_username(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.names.contains(&normalize_username(username))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn normalize_username(name: &str) -> String {
    name.trim().trim_start_matches('@').to_lowercase()
}

/// Tunables for the workflow
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub approval_emoji: String,
    pub ack_emoji: String,
    /// Tell the chat when a link could not be turned into a draft
    pub notify_link_failures: bool,
    /// Drafts older than this are dropped by `sweep_expired`
    pub pending_ttl: Option<Duration>,
    pub summary_description_limit: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            approval_emoji: "👍".to_string(),
            ack_emoji: "👀".to_string(),
            notify_link_failures: false,
            pending_ttl: None,
            summary_description_limit: 500,
        }
    }
}

impl From<&BotConfig> for WorkflowSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            approval_emoji: config.approval_emoji.clone(),
            ack_emoji: config.ack_emoji.clone(),
            notify_link_failures: config.notify_link_failures,
            pending_ttl: config.pending_ttl_secs.map(Duration::from_secs),
            summary_description_limit: config.summary_description_limit,
        }
    }
}

/// A text message sent to a chat the bot is in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub message: MessageKey,
    pub text: String,
    pub sender: Option<String>,
}

/// A change to the reactions on a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub message: MessageKey,
    /// Username of whoever reacted; anonymous reactions have none
    pub actor: Option<String>,
    /// Emojis now present from this actor
    pub emojis: Vec<String>,
}

/// Anything the workflow reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Message(IncomingMessage),
    Reaction(ReactionEvent),
}

/// Why a reaction changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotAdmin,
    NoApprovalEmoji,
    NotPending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    Ignored(IgnoreReason),
    Published { event_id: String },
    /// The draft is back in the store awaiting another approval
    PublishFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Greeted,
    NoLink,
    Drafted { posted: MessageKey, warnings: usize },
    ExtractionFailed { error: String },
    /// The draft was extracted but the summary could not be posted
    PostFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Message(MessageOutcome),
    Reaction(ReactionOutcome),
}

/// Drives drafts from a posted link to a published calendar event
pub struct ApprovalWorkflow {
    store: Arc<dyn PendingStore>,
    admins: AdminAllowlist,
    transport: Arc<dyn ChatTransport>,
    service: Arc<dyn EventService>,
    settings: WorkflowSettings,
}

impl ApprovalWorkflow {
    pub fn new(
        store: Arc<dyn PendingStore>,
        admins: AdminAllowlist,
        transport: Arc<dyn ChatTransport>,
        service: Arc<dyn EventService>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            store,
            admins,
            transport,
            service,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn PendingStore> {
        &self.store
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub async fn handle(&self, event: ChatEvent) -> EventOutcome {
        match event {
            ChatEvent::Message(message) => EventOutcome::Message(self.handle_message(message).await),
            ChatEvent::Reaction(reaction) => EventOutcome::Reaction(self.handle_reaction(reaction).await),
        }
    }

    /// Handles a reaction on any message
    ///
    /// Publishes the pending draft only when the actor is an admin, the
    /// approval emoji is present and the message holds a pending draft.
    /// The draft is taken out of the store before publishing, so a second
    /// approval arriving meanwhile finds nothing to publish.
    pub async fn handle_reaction(&self, event: ReactionEvent) -> ReactionOutcome {
        let key = event.message;

        let Some(actor) = event.actor.as_deref().filter(|actor| self.admins.contains(actor)) else {
            tracing::debug!(chat_id = key.chat_id, message_id = key.message_id, actor = ?event.actor, "Ignoring reaction from non-admin");
            return ReactionOutcome::Ignored(IgnoreReason::NotAdmin);
        };

        if !event.emojis.iter().any(|emoji| *emoji == self.settings.approval_emoji) {
            tracing::debug!(chat_id = key.chat_id, message_id = key.message_id, "Reaction is not an approval");
            return ReactionOutcome::Ignored(IgnoreReason::NoApprovalEmoji);
        }

        let Some(pending) = self.store.take(&key) else {
            tracing::info!(chat_id = key.chat_id, message_id = key.message_id, "Approval on a message with no pending draft");
            return ReactionOutcome::Ignored(IgnoreReason::NotPending);
        };

        log_transition(key, ApprovalState::Posted, ApprovalState::Approved);
        tracing::info!(actor = %actor, title = %pending.draft.title, "Draft approved, publishing");

        match self.service.create_event(&pending.draft).await {
            Ok(event_id) => {
                log_transition(key, ApprovalState::Approved, ApprovalState::Published);
                let notice = format!(
                    "Event added to the calendar! ✅\nTitle: {}\nEvent ID: {}",
                    pending.draft.title, event_id
                );
                self.notify(key.chat_id, &notice, Some(key.message_id)).await;
                ReactionOutcome::Published { event_id }
            }
            Err(e) => {
                tracing::error!(chat_id = key.chat_id, message_id = key.message_id, error = %e, "Publish failed");
                self.store.insert(key, pending);
                log_transition(key, ApprovalState::Approved, ApprovalState::Posted);
                let notice = format!(
                    "Failed to add the event to the calendar: {}\nReact with {} again to retry.",
                    e, self.settings.approval_emoji
                );
                self.notify(key.chat_id, &notice, Some(key.message_id)).await;
                ReactionOutcome::PublishFailed { error: e.to_string() }
            }
        }
    }

    /// Handles a text message
    ///
    /// `/start` gets the greeting. Otherwise the first link in the text is
    /// extracted and, on success, its summary is posted as a pending draft.
    pub async fn handle_message(&self, message: IncomingMessage) -> MessageOutcome {
        let key = message.message;

        if is_start_command(&message.text) {
            tracing::info!(chat_id = key.chat_id, "Start command received");
            self.notify(key.chat_id, GREETING, None).await;
            return MessageOutcome::Greeted;
        }

        let Some(url) = find_first_url(&message.text) else {
            return MessageOutcome::NoLink;
        };
        tracing::info!(chat_id = key.chat_id, url = %url, sender = ?message.sender, "Link detected");

        if let Err(e) = self.transport.set_reaction(key, &self.settings.ack_emoji).await {
            tracing::warn!(chat_id = key.chat_id, message_id = key.message_id, error = %e, "Failed to acknowledge link");
        }

        let parsed = match self.service.parse_event(url, DescriptionStyle::Telegram).await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Error processing link");
                if self.settings.notify_link_failures {
                    let notice = format!("Sorry, I couldn't parse that event link. Error: {}", e);
                    self.notify(key.chat_id, &notice, Some(key.message_id)).await;
                }
                return MessageOutcome::ExtractionFailed { error: e.to_string() };
            }
        };

        let summary = self.summary_text(&parsed);
        let posted = match self
            .transport
            .send_message(key.chat_id, &summary, Some(key.message_id))
            .await
        {
            Ok(posted) => posted,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Failed to post draft summary");
                return MessageOutcome::PostFailed { error: e.to_string() };
            }
        };

        let warnings = parsed.warnings.len();
        self.store.insert(
            posted,
            PendingApproval {
                draft: parsed.draft,
                chat_id: key.chat_id,
                source_url: url.to_string(),
                posted_at: Utc::now(),
            },
        );
        tracing::info!(
            chat_id = posted.chat_id,
            message_id = posted.message_id,
            state = %ApprovalState::Posted,
            pending = self.store.len(),
            "Draft posted for approval"
        );

        MessageOutcome::Drafted { posted, warnings }
    }

    /// Drops drafts older than the configured TTL
    ///
    /// Returns the evicted keys; without a TTL nothing is evicted.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<MessageKey> {
        let Some(ttl) = self.settings.pending_ttl else {
            return Vec::new();
        };
        let Some(cutoff) = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
        else {
            return Vec::new();
        };

        let evicted = self.store.evict_older_than(cutoff);
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), "Evicted expired drafts");
        }
        evicted
    }

    fn summary_text(&self, parsed: &ParsedEvent) -> String {
        let mut text = parsed.draft.chat_summary(self.settings.summary_description_limit);
        for warning in &parsed.warnings {
            text.push_str("\n⚠️ ");
            text.push_str(warning);
        }
        text
    }

    async fn notify(&self, chat_id: ChatId, text: &str, reply_to: Option<i64>) {
        if let Err(e) = self.transport.send_message(chat_id, text, reply_to).await {
            tracing::warn!(chat_id = chat_id, error = %e, "Failed to send notice");
        }
    }
}

fn log_transition(key: MessageKey, from: ApprovalState, to: ApprovalState) {
    debug_assert!(from.can_transition_to(to), "invalid transition {} -> {}", from, to);
    if to.is_terminal() {
        tracing::info!(chat_id = key.chat_id, message_id = key.message_id, state = %to, "Draft settled");
    } else {
        tracing::debug!(chat_id = key.chat_id, message_id = key.message_id, from = %from, to = %to, "Approval state change");
    }
}

/// Matches `/start` and `/start@botname`, with or without arguments
fn is_start_command(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .and_then(|command| command.split('@').next())
        .is_some_and(|command| command == "/start")
}
