//! The chat bot process
//!
//! Polls Telegram for updates and feeds them, one at a time, to the
//! approval workflow.

mod service;
mod telegram;

pub use service::HttpEventService;
pub use telegram::{ReactionType, TelegramTransport, Update, ALLOWED_UPDATES};

use crate::approval::{AdminAllowlist, ApprovalWorkflow, InMemoryPendingStore, PendingStore, WorkflowSettings};
use crate::config::Config;
use crate::ConfigError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Pause after a failed poll before trying again
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Single-threaded update loop
pub struct BotRunner {
    transport: Arc<TelegramTransport>,
    workflow: ApprovalWorkflow,
    offset: Option<i64>,
}

impl BotRunner {
    pub fn new(transport: Arc<TelegramTransport>, workflow: ApprovalWorkflow) -> Self {
        Self {
            transport,
            workflow,
            offset: None,
        }
    }

    /// Wires Telegram, the HTTP service and an in-memory store together
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let bot = &config.bot;
        let admins = AdminAllowlist::new(&bot.admin_usernames);
        if admins.is_empty() {
            tracing::warn!("No admin usernames configured; drafts can never be approved");
        }

        let transport = Arc::new(TelegramTransport::new(bot)?);
        let service = Arc::new(HttpEventService::new(bot)?);
        tracing::info!(api_url = %service.base_url(), admins = admins.len(), "Bot configured");

        let workflow = ApprovalWorkflow::new(
            Arc::new(InMemoryPendingStore::new()),
            admins,
            transport.clone(),
            service,
            WorkflowSettings::from(bot),
        );
        Ok(Self::new(transport, workflow))
    }

    pub fn workflow(&self) -> &ApprovalWorkflow {
        &self.workflow
    }

    /// Fetches one batch of updates and handles each in order
    ///
    /// Returns the number of updates received.
    pub async fn poll_once(&mut self) -> Result<usize, crate::approval::TransportError> {
        self.workflow.sweep_expired(Utc::now());

        let updates = self.transport.get_updates(self.offset).await?;
        let count = updates.len();

        for update in updates {
            self.offset = Some(update.update_id + 1);
            let Some(event) = update.into_event() else {
                continue;
            };
            let outcome = self.workflow.handle(event).await;
            tracing::debug!(?outcome, "Update handled");
        }

        Ok(count)
    }

    /// Pending drafts live in memory and are lost on exit
    fn log_discarded_drafts(&self) {
        let pending = self.workflow.store().message_ids();
        if !pending.is_empty() {
            tracing::warn!(count = pending.len(), messages = ?pending, "Discarding unapproved drafts");
        }
    }

    /// Polls until interrupted with Ctrl-C
    pub async fn run(mut self) {
        tracing::info!("Starting bot...");

        loop {
            let result = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping bot");
                    self.log_discarded_drafts();
                    return;
                }
                result = self.poll_once() => result,
            };

            if let Err(e) = result {
                tracing::warn!(error = %e, "Polling failed, retrying in {:?}", POLL_ERROR_BACKOFF);
                tokio::time::sleep(POLL_ERROR_BACKOFF).await;
            }
        }
    }
}
