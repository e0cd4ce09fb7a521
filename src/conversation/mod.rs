//! Conversation framework
//!
//! Multi-turn guided dialogs driven by an explicit finite-state machine per
//! chat. A conversation is a set of named states; each state carries an
//! ordered transition table keyed by a literal sub-command, a shared contact
//! card, or free text. State and scratch data live in a repository keyed by
//! (chat id, optional user id), loaded at the start of a turn and saved at
//! the end, never in ambient per-request context.

pub mod config_dialog;
pub mod engine;
pub mod friends_dialog;
pub mod store;

pub use engine::ConversationEngine;
pub use store::{ConversationKey, ConversationState, ConversationStore};

use std::collections::HashMap;

use futures_util::future::BoxFuture;

use crate::auth::{Guard, Sender};
use crate::core::error::AppResult;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::outbound::MessageRef;

/// Transient per-conversation key-value data carried between turns
pub type Scratch = HashMap<String, String>;

/// Scratch keys used by the prompt-caching helpers
pub mod keys {
    pub const PROMPT_CHAT: &str = "prompt.chat";
    pub const PROMPT_MESSAGE: &str = "prompt.message";
}

/// Everything a turn sees: the sender, the parsed input, shared dependencies
/// and the conversation scratch. Owned for the duration of one turn.
pub struct TurnContext {
    pub chat: i64,
    pub sender: Option<Sender>,
    pub input: TurnInput,
    pub deps: HandlerDeps,
    pub scratch: Scratch,
}

impl TurnContext {
    pub fn new(chat: i64, sender: Option<Sender>, input: TurnInput, deps: HandlerDeps) -> Self {
        Self {
            chat,
            sender,
            input,
            deps,
            scratch: Scratch::new(),
        }
    }

    /// Repository key for this chat's conversation state
    pub fn key(&self) -> ConversationKey {
        ConversationKey {
            chat: self.chat,
            user: None,
        }
    }

    /// Raw command text for forensic logging
    pub fn command_text(&self) -> &str {
        self.input.text.as_deref().unwrap_or("<contact>")
    }
}

/// Parsed inbound message content
#[derive(Clone, Debug, Default)]
pub struct TurnInput {
    pub text: Option<String>,
    /// User id from a shared contact card, if any
    pub contact: Option<i64>,
}

impl TurnInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            contact: None,
        }
    }

    pub fn from_contact(user_id: i64) -> Self {
        Self {
            text: None,
            contact: Some(user_id),
        }
    }

    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// First whitespace-separated token with any leading `/` stripped
    pub fn first_token(&self) -> Option<&str> {
        self.trimmed_text()?
            .split_whitespace()
            .next()
            .map(|token| token.trim_start_matches('/'))
    }

    /// n-th whitespace-separated token (0 is the command itself)
    pub fn arg(&self, n: usize) -> Option<&str> {
        self.trimmed_text()?.split_whitespace().nth(n)
    }

    pub fn is_command(&self) -> bool {
        self.trimmed_text()
            .map(|text| text.starts_with('/'))
            .unwrap_or(false)
    }
}

/// What a state action tells the engine to do with the conversation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Keep the current state (validation failed, or the state re-rendered)
    Stay,
    /// Advance to the named state
    Goto(&'static str),
    /// Conversation finished or aborted; state and scratch are destroyed
    End,
}

/// What fires a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Exact match on the first token of the message (leading `/` stripped,
    /// case-insensitive)
    Sub(&'static str),
    /// A shared contact card
    Contact,
    /// Any non-empty free-text message: the wildcard, checked after the
    /// literal triggers by keeping it last in the transition list
    Text,
}

impl Trigger {
    pub fn matches(&self, input: &TurnInput) -> bool {
        match self {
            Trigger::Sub(word) => input
                .first_token()
                .map(|token| token.eq_ignore_ascii_case(word))
                .unwrap_or(false),
            Trigger::Contact => input.contact.is_some(),
            Trigger::Text => input.trimmed_text().is_some(),
        }
    }
}

/// A state action: reads the turn input, talks to the user, returns the next
/// step. Plain async fns coerced to this pointer type.
pub type ActionFn = for<'a> fn(&'a mut TurnContext) -> BoxFuture<'a, AppResult<Step>>;

pub struct Transition {
    pub trigger: Trigger,
    pub action: ActionFn,
}

pub struct StateDef {
    pub name: &'static str,
    pub transitions: Vec<Transition>,
}

/// A complete conversation definition: the entry command, the required
/// permission tier, the entry action and the state table.
pub struct ConversationSpec {
    /// Top-level command that starts the conversation
    pub command: &'static str,
    pub guard: Guard,
    /// Runs on the entry command; sends the explanatory prompt and returns
    /// `Goto(first)`
    pub entry: ActionFn,
    /// Name of the first post-entry state. The cancel sub-command is honored
    /// in every state except this one.
    pub first: &'static str,
    pub states: Vec<StateDef>,
}

/// Remembers the prompt message so later states can edit it in place instead
/// of sending a new message per turn.
pub fn cache_prompt(scratch: &mut Scratch, sent: MessageRef) {
    scratch.insert(keys::PROMPT_CHAT.to_string(), sent.chat.to_string());
    scratch.insert(keys::PROMPT_MESSAGE.to_string(), sent.message.to_string());
}

pub fn cached_prompt(scratch: &Scratch) -> Option<MessageRef> {
    let chat = scratch.get(keys::PROMPT_CHAT)?.parse().ok()?;
    let message = scratch.get(keys::PROMPT_MESSAGE)?.parse().ok()?;
    Some(MessageRef { chat, message })
}

/// Edits the cached prompt, or sends (and caches) a fresh one when no prompt
/// was cached yet.
pub async fn edit_prompt(ctx: &mut TurnContext, text: &str) -> AppResult<()> {
    match cached_prompt(&ctx.scratch) {
        Some(target) => {
            ctx.deps
                .messenger
                .edit_message_text(target, text, None)
                .await
        }
        None => {
            let sent = ctx.deps.messenger.send_message(ctx.chat, text, None).await?;
            cache_prompt(&mut ctx.scratch, sent);
            Ok(())
        }
    }
}

/// Finalizes a conversation: deletes the cached prompt (best effort) and
/// sends a plain result message.
pub async fn finalize(ctx: &mut TurnContext, text: &str) -> AppResult<()> {
    if let Some(target) = cached_prompt(&ctx.scratch) {
        if let Err(e) = ctx.deps.messenger.delete_message(target).await {
            log::warn!("failed to delete prompt message {:?}: {}", target, e);
        }
    }
    ctx.deps.messenger.send_message(ctx.chat, text, None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_token_strips_slash_and_splits() {
        let input = TurnInput::from_text("  /config get  ");
        assert_eq!(input.first_token(), Some("config"));
        assert_eq!(input.arg(1), Some("get"));
        assert!(input.is_command());
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        let input = TurnInput::from_text("hello there");
        assert_eq!(input.first_token(), Some("hello"));
        assert!(!input.is_command());
    }

    #[test]
    fn test_trigger_matching() {
        let set = TurnInput::from_text("set");
        assert!(Trigger::Sub("set").matches(&set));
        assert!(Trigger::Sub("SET").matches(&set));
        assert!(!Trigger::Sub("get").matches(&set));
        assert!(Trigger::Text.matches(&set));
        assert!(!Trigger::Contact.matches(&set));

        let contact = TurnInput::from_contact(21);
        assert!(Trigger::Contact.matches(&contact));
        assert!(!Trigger::Text.matches(&contact));

        let blank = TurnInput::from_text("   ");
        assert!(!Trigger::Text.matches(&blank));
    }

    #[test]
    fn test_prompt_cache_round_trip() {
        let mut scratch = Scratch::new();
        assert_eq!(cached_prompt(&scratch), None);
        cache_prompt(
            &mut scratch,
            MessageRef {
                chat: 7,
                message: 42,
            },
        );
        assert_eq!(
            cached_prompt(&scratch),
            Some(MessageRef {
                chat: 7,
                message: 42
            })
        );
    }
}
