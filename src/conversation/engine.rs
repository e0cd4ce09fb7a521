//! Conversation driver
//!
//! One engine instance per conversation definition. The engine owns the
//! turn lifecycle: load state, honor the global cancel sub-command, find the
//! first matching transition, run its action, persist or destroy state
//! according to the returned step.

use std::sync::Arc;

use crate::conversation::store::{ConversationKey, ConversationState, ConversationStore};
use crate::conversation::{ConversationSpec, Step, TurnContext};
use crate::core::error::AppResult;

pub struct ConversationEngine {
    spec: ConversationSpec,
    store: Arc<ConversationStore>,
}

impl ConversationEngine {
    pub fn new(spec: ConversationSpec, store: Arc<ConversationStore>) -> Self {
        Self { spec, store }
    }

    pub fn command(&self) -> &'static str {
        self.spec.command
    }

    pub fn guard(&self) -> crate::auth::Guard {
        self.spec.guard
    }

    /// Handles the entry command. Any previous conversation in the chat is
    /// discarded and the dialog starts over.
    pub async fn start(&self, ctx: &mut TurnContext) -> AppResult<()> {
        let key = ctx.key();
        self.store.clear(&key);
        ctx.scratch.clear();
        log::debug!("chat {} entered /{}", ctx.chat, self.spec.command);
        let step = (self.spec.entry)(ctx).await?;
        self.apply(key, self.spec.first, step, ctx);
        Ok(())
    }

    /// Handles a turn of an in-flight conversation.
    pub async fn resume(&self, ctx: &mut TurnContext, current: ConversationState) -> AppResult<()> {
        let key = ctx.key();

        // cancel is honored unconditionally in every non-entry state
        if current.state != self.spec.first && is_cancel(ctx) {
            self.store.clear(&key);
            ctx.scratch.clear();
            log::debug!("chat {} cancelled /{}", ctx.chat, self.spec.command);
            ctx.deps
                .messenger
                .send_message(ctx.chat, "Okay, cancelled.", None)
                .await?;
            return Ok(());
        }

        let Some(state_def) = self
            .spec
            .states
            .iter()
            .find(|state| state.name == current.state)
        else {
            log::warn!(
                "chat {} carried unknown state {} for /{}, closing the dialog",
                ctx.chat,
                current.state,
                self.spec.command
            );
            return self.abort(ctx).await;
        };

        let Some(transition) = state_def
            .transitions
            .iter()
            .find(|transition| transition.trigger.matches(&ctx.input))
        else {
            log::debug!(
                "chat {} sent unexpected input in state {} of /{}",
                ctx.chat,
                current.state,
                self.spec.command
            );
            return self.abort(ctx).await;
        };

        ctx.scratch = current.scratch;
        let step = (transition.action)(ctx).await?;
        self.apply(key, &current.state, step, ctx);
        Ok(())
    }

    /// Unrecoverable input: destroy the conversation and tell the user.
    async fn abort(&self, ctx: &mut TurnContext) -> AppResult<()> {
        self.store.clear(&ctx.key());
        ctx.scratch.clear();
        ctx.deps
            .messenger
            .send_message(
                ctx.chat,
                "That wasn't something I expected here, so I closed the dialog.",
                None,
            )
            .await?;
        Ok(())
    }

    fn apply(&self, key: ConversationKey, from: &str, step: Step, ctx: &mut TurnContext) {
        match step {
            Step::Stay => self.save(key, from, ctx),
            Step::Goto(next) => self.save(key, next, ctx),
            Step::End => {
                self.store.clear(&key);
                ctx.scratch.clear();
            }
        }
    }

    fn save(&self, key: ConversationKey, state: &str, ctx: &TurnContext) {
        self.store.save(
            key,
            ConversationState {
                conversation: self.spec.command.to_string(),
                state: state.to_string(),
                scratch: ctx.scratch.clone(),
            },
        );
    }
}

fn is_cancel(ctx: &TurnContext) -> bool {
    ctx.input
        .first_token()
        .map(|token| token.eq_ignore_ascii_case("cancel"))
        .unwrap_or(false)
}
