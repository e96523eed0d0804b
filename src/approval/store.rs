//! Pending approval storage
//!
//! Drafts waiting for an admin reaction live here, keyed by the chat message
//! the bot posted for them. Nothing survives a restart.

use crate::draft::EventDraft;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Chat identifier as assigned by the chat platform
pub type ChatId = i64;

/// Identifies one message in one chat
///
/// Telegram message ids are only unique within a chat, so both parts are
/// needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub chat_id: ChatId,
    pub message_id: i64,
}

impl MessageKey {
    pub fn new(chat_id: ChatId, message_id: i64) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

/// A posted draft awaiting sign-off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingApproval {
    pub draft: EventDraft,
    pub chat_id: ChatId,
    /// Link the draft was extracted from
    pub source_url: String,
    pub posted_at: DateTime<Utc>,
}

/// Storage for pending approvals
///
/// Methods are synchronous; implementations must not hold locks across
/// calls.
pub trait PendingStore: Send + Sync {
    /// Stores an entry, replacing any previous one for the key
    fn insert(&self, key: MessageKey, entry: PendingApproval);

    fn get(&self, key: &MessageKey) -> Option<PendingApproval>;

    /// Removes and returns the entry in one step
    ///
    /// Of two concurrent callers for the same key, exactly one gets `Some`.
    fn take(&self, key: &MessageKey) -> Option<PendingApproval>;

    /// Removes the entry, returning whether it existed
    fn remove(&self, key: &MessageKey) -> bool {
        self.take(key).is_some()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of every pending entry, in no particular order
    fn message_ids(&self) -> Vec<MessageKey>;

    /// Drops entries posted before `cutoff` and returns their keys
    fn evict_older_than(&self, cutoff: DateTime<Utc>) -> Vec<MessageKey>;
}

/// Process-local pending store
#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    entries: Mutex<HashMap<MessageKey, PendingApproval>>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MessageKey, PendingApproval>> {
        // A panic elsewhere cannot leave the map half-written
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PendingStore for InMemoryPendingStore {
    fn insert(&self, key: MessageKey, entry: PendingApproval) {
        self.lock().insert(key, entry);
    }

    fn get(&self, key: &MessageKey) -> Option<PendingApproval> {
        self.lock().get(key).cloned()
    }

    fn take(&self, key: &MessageKey) -> Option<PendingApproval> {
        self.lock().remove(key)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn message_ids(&self) -> Vec<MessageKey> {
        self.lock().keys().copied().collect()
    }

    fn evict_older_than(&self, cutoff: DateTime<Utc>) -> Vec<MessageKey> {
        let mut entries = self.lock();
        let expired: Vec<MessageKey> = entries
            .iter()
            .filter(|(_, entry)| entry.posted_at < cutoff)
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            entries.remove(key);
        }
        expired
    }
}
