//! Sender authorization
//!
//! Three permission tiers evaluated as explicit predicates before any handler
//! runs. A denial is not an error: the gate logs exactly one line per
//! rejection and the router lets the update fall through to lower-priority
//! handling. Handler bodies never see unauthorized updates.

pub mod friends;

pub use friends::{FRIENDS_KEY, FriendsRegistry};

use crate::core::utils::truncate_for_log;

/// Permission tier required by a route.
///
/// `OnlyReal` is the prerequisite for the other two: an update with no
/// resolvable sender, or from an automated account, fails every guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    OnlyReal,
    OnlyOwner,
    OnlyFriends,
}

impl Guard {
    pub fn name(&self) -> &'static str {
        match self {
            Guard::OnlyReal => "only_real",
            Guard::OnlyOwner => "only_owner",
            Guard::OnlyFriends => "only_friends",
        }
    }
}

/// The resolved sender of an inbound update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub is_bot: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    NoSender,
    BotSender,
    UnauthorizedUser,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// The forensic log line written for a denial. Command text is truncated to
/// its first 10 characters so full payloads never land in logs.
pub fn deny_line(guard: Guard, reason: DenyReason, sender: Option<Sender>, command: &str) -> String {
    let command = truncate_for_log(command);
    match reason {
        DenyReason::NoSender => format!(
            "rejected an update without a sender on a {} command: {}",
            guard.name(),
            command
        ),
        DenyReason::BotSender => format!(
            "bot account {} tried to access a {} command: {}",
            sender.map(|s| s.id).unwrap_or_default(),
            guard.name(),
            command
        ),
        DenyReason::UnauthorizedUser => format!(
            "user {} tried to access a {} command: {}",
            sender.map(|s| s.id).unwrap_or_default(),
            guard.name(),
            command
        ),
    }
}

/// Evaluates permission tiers against a sender
#[derive(Clone)]
pub struct AuthorizationGate {
    owner_id: i64,
    friends: FriendsRegistry,
}

impl AuthorizationGate {
    pub fn new(owner_id: i64, friends: FriendsRegistry) -> Self {
        Self { owner_id, friends }
    }

    /// Checks `guard` against the sender of an update. Exactly one log line
    /// per denial; `command` is only used (truncated) for that line.
    pub fn check(&self, guard: Guard, sender: Option<Sender>, command: &str) -> Decision {
        let Some(resolved) = sender else {
            return self.deny(guard, DenyReason::NoSender, sender, command);
        };
        if resolved.is_bot {
            return self.deny(guard, DenyReason::BotSender, sender, command);
        }

        match guard {
            Guard::OnlyReal => Decision::Allow,
            Guard::OnlyOwner => {
                if resolved.id == self.owner_id {
                    Decision::Allow
                } else {
                    self.deny(guard, DenyReason::UnauthorizedUser, sender, command)
                }
            }
            Guard::OnlyFriends => {
                if resolved.id == self.owner_id {
                    return Decision::Allow;
                }
                match self.friends.stored() {
                    // Never initialized: open access so the owner can
                    // bootstrap the list before adding anyone.
                    Ok(None) => Decision::Allow,
                    Ok(Some(friends)) if friends.contains(&resolved.id) => Decision::Allow,
                    Ok(Some(_)) => self.deny(guard, DenyReason::UnauthorizedUser, sender, command),
                    Err(e) => {
                        log::error!("failed to read the friends list: {}", e);
                        self.deny(guard, DenyReason::UnauthorizedUser, sender, command)
                    }
                }
            }
        }
    }

    fn deny(
        &self,
        guard: Guard,
        reason: DenyReason,
        sender: Option<Sender>,
        command: &str,
    ) -> Decision {
        log::warn!("{}", deny_line(guard, reason, sender, command));
        Decision::Deny(reason)
    }
}
