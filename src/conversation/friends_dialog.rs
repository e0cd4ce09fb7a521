//! The /friends conversation
//!
//! Listing with pagination, adding via contact card or numeric id, and
//! removal with an explicit confirm step. The listing caches the ids of the
//! page it last rendered, and positional selection resolves against that
//! cache; indices are only ever valid for the page the user is looking at.

use futures_util::future::BoxFuture;

use crate::auth::Guard;
use crate::conversation::{
    ConversationSpec, StateDef, Step, Transition, Trigger, TurnContext, cache_prompt, edit_prompt,
    finalize,
};
use crate::core::error::AppResult;

/// Friends shown per listing page
pub const PAGE_SIZE: usize = 5;

const PAGE_SLOT: &str = "friends.page";
const PAGE_IDS_SLOT: &str = "friends.page_ids";
const TARGET_SLOT: &str = "friends.del_target";

pub fn spec() -> ConversationSpec {
    ConversationSpec {
        command: "friends",
        guard: Guard::OnlyOwner,
        entry,
        first: "start",
        states: vec![
            StateDef {
                name: "start",
                transitions: vec![
                    Transition {
                        trigger: Trigger::Sub("list"),
                        action: open_listing,
                    },
                    Transition {
                        trigger: Trigger::Sub("add"),
                        action: choose_add,
                    },
                    Transition {
                        trigger: Trigger::Sub("del"),
                        action: choose_del,
                    },
                ],
            },
            StateDef {
                name: "listing",
                transitions: vec![
                    Transition {
                        trigger: Trigger::Sub("next"),
                        action: next_page,
                    },
                    Transition {
                        trigger: Trigger::Sub("restart"),
                        action: first_page,
                    },
                    Transition {
                        trigger: Trigger::Text,
                        action: pick_position,
                    },
                ],
            },
            StateDef {
                name: "await_add",
                transitions: vec![
                    Transition {
                        trigger: Trigger::Contact,
                        action: add_friend,
                    },
                    Transition {
                        trigger: Trigger::Text,
                        action: add_friend,
                    },
                ],
            },
            StateDef {
                name: "await_del",
                transitions: vec![
                    Transition {
                        trigger: Trigger::Contact,
                        action: target_from_input,
                    },
                    Transition {
                        trigger: Trigger::Text,
                        action: target_from_input,
                    },
                ],
            },
            StateDef {
                name: "confirm_del",
                transitions: vec![
                    Transition {
                        trigger: Trigger::Sub("yes"),
                        action: confirm_removal,
                    },
                    Transition {
                        trigger: Trigger::Text,
                        action: abort_removal,
                    },
                ],
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
                "Friends list manager. Reply with list, add or del. \
                 cancel closes the dialog at any point.",
                None,
            )
            .await?;
        cache_prompt(&mut ctx.scratch, sent);
        Ok(Step::Goto("start"))
    })
}

/// Resolves a friend id from either a contact card or a numeric message.
fn resolve_id(ctx: &TurnContext) -> Option<i64> {
    if let Some(id) = ctx.input.contact {
        return Some(id);
    }
    ctx.input
        .trimmed_text()?
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
}

/// Renders one page of the friends list into the prompt and caches the
/// displayed ids for positional selection.
async fn render_page(ctx: &mut TurnContext, page: usize) -> AppResult<()> {
    let friends = ctx.deps.friends.list()?;
    let pages = friends.len().div_ceil(PAGE_SIZE).max(1);
    let page = page.min(pages - 1);
    let shown: Vec<i64> = friends
        .iter()
        .skip(page * PAGE_SIZE)
        .take(PAGE_SIZE)
        .copied()
        .collect();

    let mut text = format!("Friends, page {}/{}:\n", page + 1, pages);
    for (position, id) in shown.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", position + 1, id));
    }
    let more_remain = (page + 1) * PAGE_SIZE < friends.len();
    if more_remain {
        text.push_str("Reply with a number to remove that entry, next for the next page, or cancel.");
    } else {
        text.push_str(
            "Reply with a number to remove that entry, restart for the first page, or cancel.",
        );
    }

    ctx.scratch.insert(PAGE_SLOT.to_string(), page.to_string());
    ctx.scratch
        .insert(PAGE_IDS_SLOT.to_string(), serde_json::to_string(&shown)?);
    edit_prompt(ctx, &text).await
}

fn open_listing(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        if ctx.deps.friends.list()?.is_empty() {
            finalize(ctx, "The friends list is empty. Use add to allow someone in.").await?;
            return Ok(Step::End);
        }
        render_page(ctx, 0).await?;
        Ok(Step::Goto("listing"))
    })
}

fn next_page(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        let page: usize = ctx
            .scratch
            .get(PAGE_SLOT)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0);
        render_page(ctx, page + 1).await?;
        Ok(Step::Stay)
    })
}

fn first_page(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        render_page(ctx, 0).await?;
        Ok(Step::Stay)
    })
}

fn pick_position(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        let shown: Vec<i64> = ctx
            .scratch
            .get(PAGE_IDS_SLOT)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        let position = ctx
            .input
            .trimmed_text()
            .and_then(|text| text.parse::<usize>().ok());
        let Some(id) = position
            .filter(|p| (1..=shown.len()).contains(p))
            .map(|p| shown[p - 1])
        else {
            edit_prompt(ctx, "Pick one of the numbers shown on the page, next, restart or cancel.")
                .await?;
            return Ok(Step::Stay);
        };
        ctx.scratch.insert(TARGET_SLOT.to_string(), id.to_string());
        edit_prompt(
            ctx,
            &format!("Remove {id} from the friends list? Reply yes to confirm."),
        )
        .await?;
        Ok(Step::Goto("confirm_del"))
    })
}

fn choose_add(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        edit_prompt(
            ctx,
            "Send me a contact card or the numeric Telegram id to allow.",
        )
        .await?;
        Ok(Step::Goto("await_add"))
    })
}

fn add_friend(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        let Some(id) = resolve_id(ctx) else {
            edit_prompt(ctx, "I need a contact card or a positive numeric id. Try again.").await?;
            return Ok(Step::Stay);
        };
        if id == ctx.deps.friends.owner_id() {
            finalize(ctx, "That's you. The owner always has access.").await?;
            return Ok(Step::End);
        }
        if ctx.deps.friends.contains(id)? {
            finalize(ctx, &format!("{id} is already on the friends list.")).await?;
            return Ok(Step::End);
        }
        ctx.deps.friends.add(id)?;
        finalize(ctx, &format!("Added {id} to the friends list.")).await?;
        Ok(Step::End)
    })
}

fn choose_del(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        edit_prompt(
            ctx,
            "Send me a contact card or the numeric id to remove, or use list and pick a number.",
        )
        .await?;
        Ok(Step::Goto("await_del"))
    })
}

fn target_from_input(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        let Some(id) = resolve_id(ctx) else {
            edit_prompt(ctx, "I need a contact card or a positive numeric id. Try again.").await?;
            return Ok(Step::Stay);
        };
        ctx.scratch.insert(TARGET_SLOT.to_string(), id.to_string());
        edit_prompt(
            ctx,
            &format!("Remove {id} from the friends list? Reply yes to confirm."),
        )
        .await?;
        Ok(Step::Goto("confirm_del"))
    })
}

fn confirm_removal(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        let Some(id) = ctx
            .scratch
            .get(TARGET_SLOT)
            .and_then(|raw| raw.parse::<i64>().ok())
        else {
            finalize(ctx, "I lost track of who we were removing, sorry.").await?;
            return Ok(Step::End);
        };
        if !ctx.deps.friends.contains(id)? {
            finalize(ctx, &format!("{id} wasn't on the friends list.")).await?;
            return Ok(Step::End);
        }
        ctx.deps.friends.remove(id)?;
        finalize(ctx, &format!("Removed {id} from the friends list.")).await?;
        Ok(Step::End)
    })
}

fn abort_removal(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<Step>> {
    Box::pin(async move {
        finalize(ctx, "Okay, leaving the friends list alone.").await?;
        Ok(Step::End)
    })
}
