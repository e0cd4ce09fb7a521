//! Friends whitelist
//!
//! The owner's list of non-owner user ids allowed to use friend-tier
//! commands, serialized as a JSON array under the reserved config key
//! `auth.friends`. Both mutations are a read-modify-write over the whole
//! array; two concurrent edits can lose an update (last write wins). Accepted
//! for the single-operator deployment model, not remediated.

use crate::core::error::{AppError, AppResult};
use crate::storage::kv::KeyValueStore;

/// Reserved config key holding the serialized friends list
pub const FRIENDS_KEY: &str = "auth.friends";

#[derive(Clone)]
pub struct FriendsRegistry {
    kv: KeyValueStore,
    owner_id: i64,
}

impl FriendsRegistry {
    pub fn new(kv: KeyValueStore, owner_id: i64) -> Self {
        Self { kv, owner_id }
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    /// The stored list, or `None` if the entry was never written.
    ///
    /// The distinction matters to `only_friends`: an absent list means the
    /// whitelist was never initialized and access is open for bootstrap; an
    /// existing list restricts, even an empty one.
    pub fn stored(&self) -> AppResult<Option<Vec<i64>>> {
        match self.kv.get(FRIENDS_KEY) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The friend ids, empty when the entry is absent.
    pub fn list(&self) -> AppResult<Vec<i64>> {
        Ok(self.stored()?.unwrap_or_default())
    }

    pub fn contains(&self, id: i64) -> AppResult<bool> {
        Ok(self.list()?.contains(&id))
    }

    /// Adds a friend. A no-op when the id is already present or is the
    /// owner's own id; the owner never appears in the list.
    pub fn add(&self, id: i64) -> AppResult<()> {
        if id == self.owner_id {
            log::debug!("not adding owner {} to the friends list", id);
            return Ok(());
        }
        let mut friends = self.list()?;
        if friends.contains(&id) {
            return Ok(());
        }
        friends.push(id);
        self.persist(&friends)
    }

    /// Removes a friend. Removing an absent id is a no-op, not an error.
    pub fn remove(&self, id: i64) -> AppResult<()> {
        let mut friends = self.list()?;
        if !friends.contains(&id) {
            return Ok(());
        }
        friends.retain(|friend| *friend != id);
        self.persist(&friends)
    }

    fn persist(&self, friends: &[i64]) -> AppResult<()> {
        self.kv.set(FRIENDS_KEY, &serde_json::to_string(friends)?)
    }
}
