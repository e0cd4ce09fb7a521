//! The /config conversation
//!
//! Guided get/set/delete of a configuration key. State machine:
//!
//! `start --get--> await_get_key --(text)--> end`
//! `start --set--> await_set_key --(text)--> await_set_value --(text)--> end`
//! `start --del--> await_del_key --(text)--> end`
//!
//! A syntactically invalid key re-prompts without advancing. On the set path
//! a valid-but-absent key is a normal continue (that's how new keys are
//! born); on get/del an absent key ends the dialog with a polite shrug.

use futures_util::future::BoxFuture;

use crate::auth::Guard;
use crate::conversation::{
    ConversationSpec, StateDef, Step, Transition, Trigger, TurnContext, cache_prompt, edit_prompt,
    finalize,
};
use crate::core::error::{AppError, AppResult};
use crate::storage::kv::validate_key;

/// Scratch slot holding the key chosen on the set path
const KEY_SLOT: &str = "config.key";

const BAD_KEY_HINT: &str =
    "That doesn't look like a config key: lowercase words separated by dots, \
     at most 16 characters (like net.proxy).";

pub fn spec() -> ConversationSpec {
    ConversationSpec {
        command: "config",
        guard: Guard::OnlyOwner,
        entry,
        first: "start",
        states: vec![
            StateDef {
                name: "start",
                transitions: vec![
                    Transition {
                        trigger: Trigger::Sub("get"),
                        action: choose_get,
                    },
                    Transition {
                        trigger: Trigger::Sub("set"),
                        action: choose_set,
                    },
                    Transition {
                        trigger: Trigger::Sub("del"),
                        action: choose_del,
                    },
                ],
            },
            StateDef {
                name: "await_get_key",
                transitions: vec![Transition {
                    trigger: Trigger::Text,
                    action: read_key,
                }],
            },
            StateDef {
                name: "await_set_key",
                transitions: vec![Transition {
                    trigger: Trigger::Text,
                    action: pick_key,
                }],
            },
            StateDef {
                name: "await_set_value",
                transitions: vec![Transition {
                    trigger: Trigger::Text,
                    action: store_value,
                }],
            },
            StateDef {
                name: "await_del_key",
                transitions: vec![Transition {
                    trigger: Trigger::Text,
                    action: drop_key,
                }],
            },
        ],
    }
}

fn entry(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        let sent = ctx
            .deps
            .messenger
            .send_message(
                ctx.chat,
                "Configuration editor. Reply with get, set or del. \
                 cancel closes the dialog at any point.",
                None,
            )
            .await?;
        cache_prompt(&mut ctx.scratch, sent);
        Ok(Step::Goto("start"))
    })
}

fn choose_get(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        edit_prompt(ctx, "Which key should I read?").await?;
        Ok(Step::Goto("await_get_key"))
    })
}

fn choose_set(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        edit_prompt(ctx, "Which key should I set?").await?;
        Ok(Step::Goto("await_set_key"))
    })
}

fn choose_del(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        edit_prompt(ctx, "Which key should I delete?").await?;
        Ok(Step::Goto("await_del_key"))
    })
}

fn read_key(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        let key = ctx.input.trimmed_text().unwrap_or_default().to_string();
        match ctx.deps.kv.get(&key) {
            Ok(value) => {
                finalize(ctx, &format!("{key} = {value}")).await?;
                Ok(Step::End)
            }
            Err(AppError::InvalidKey(_)) => {
                edit_prompt(ctx, &format!("{BAD_KEY_HINT} Which key should I read?")).await?;
                Ok(Step::Stay)
            }
            Err(AppError::NotFound(_)) => {
                finalize(ctx, "I don't know anything about that key.").await?;
                Ok(Step::End)
            }
            Err(e) => Err(e),
        }
    })
}

fn pick_key(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        let key = ctx.input.trimmed_text().unwrap_or_default().to_string();
        if validate_key(&key).is_err() {
            edit_prompt(ctx, &format!("{BAD_KEY_HINT} Which key should I set?")).await?;
            return Ok(Step::Stay);
        }
        // An absent key is fine here; this is how new keys get created.
        ctx.scratch.insert(KEY_SLOT.to_string(), key.clone());
        edit_prompt(ctx, &format!("And what should {key} be?")).await?;
        Ok(Step::Goto("await_set_value"))
    })
}

fn store_value(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        let Some(key) = ctx.scratch.get(KEY_SLOT).cloned() else {
            // Scratch lost its key; nothing sane to do but close.
            finalize(ctx, "I lost track of which key we were setting, sorry.").await?;
            return Ok(Step::End);
        };
        let value = ctx.input.trimmed_text().unwrap_or_default().to_string();
        ctx.deps.kv.set(&key, &value)?;
        finalize(ctx, &format!("{key} is now set.")).await?;
        Ok(Step::End)
    })
}

fn drop_key(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        let key = ctx.input.trimmed_text().unwrap_or_default().to_string();
        match ctx.deps.kv.delete(&key) {
            Ok(()) => {
                finalize(ctx, &format!("{key} is gone.")).await?;
                Ok(Step::End)
            }
            Err(AppError::InvalidKey(_)) => {
                edit_prompt(ctx, &format!("{BAD_KEY_HINT} Which key should I delete?")).await?;
                Ok(Step::Stay)
            }
            Err(AppError::NotFound(_)) => {
                finalize(ctx, "I don't know anything about that key.").await?;
                Ok(Step::End)
            }
            Err(e) => Err(e),
        }
    })
}
