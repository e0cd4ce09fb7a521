//! Conversation state repository
//!
//! In-process storage for in-flight conversations, keyed by (chat id,
//! optional user id). Ownership of a state is exclusive to the single chat
//! conversation; the design assumes one human operator per chat at a time and
//! does not serialize concurrent turns in the same chat. State does not
//! survive a restart, matching the per-process chat data of the original
//! deployment model.

use dashmap::DashMap;

use crate::conversation::Scratch;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub chat: i64,
    pub user: Option<i64>,
}

/// Position of one in-flight conversation plus its scratch data
#[derive(Clone, Debug, Default)]
pub struct ConversationState {
    /// Entry command of the owning conversation
    pub conversation: String,
    /// Name of the current state
    pub state: String,
    pub scratch: Scratch,
}

#[derive(Default)]
pub struct ConversationStore {
    inner: DashMap<ConversationKey, ConversationState>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a copy of the state at the start of a turn
    pub fn load(&self, key: &ConversationKey) -> Option<ConversationState> {
        self.inner.get(key).map(|entry| entry.clone())
    }

    /// Saves the state at the end of a turn
    pub fn save(&self, key: ConversationKey, state: ConversationState) {
        self.inner.insert(key, state);
    }

    /// Destroys the state on completion, cancellation or unrecoverable input
    pub fn clear(&self, key: &ConversationKey) {
        self.inner.remove(key);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
