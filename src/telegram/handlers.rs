//! Dispatcher schema and handler dependencies
//!
//! The teloxide glue: one message endpoint that turns an inbound `Message`
//! into a [`TurnContext`] and hands it to the router. Everything the router
//! and the conversation actions need travels in [`HandlerDeps`].

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use crate::auth::{AuthorizationGate, FriendsRegistry, Sender};
use crate::conversation::{TurnContext, TurnInput};
use crate::router::CommandRouter;
use crate::storage::kv::KeyValueStore;
use crate::storage::record::RelationStore;
use crate::tasks::TaskQueue;
use crate::telegram::outbound::Messenger;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers and conversation actions
#[derive(Clone)]
pub struct HandlerDeps {
    pub kv: KeyValueStore,
    pub relations: RelationStore,
    pub friends: FriendsRegistry,
    pub gate: AuthorizationGate,
    pub messenger: Arc<dyn Messenger>,
    pub broker: Arc<dyn TaskQueue>,
}

/// Builds a turn context from an inbound Telegram message.
pub fn turn_context(msg: &Message, deps: HandlerDeps) -> TurnContext {
    let sender = msg.from.as_ref().and_then(|user| {
        i64::try_from(user.id.0).ok().map(|id| Sender {
            id,
            is_bot: user.is_bot,
        })
    });
    let input = TurnInput {
        text: msg.text().map(|text| text.to_string()),
        contact: msg
            .contact()
            .and_then(|contact| contact.user_id)
            .and_then(|user_id| i64::try_from(user_id.0).ok()),
    };
    TurnContext::new(msg.chat.id.0, sender, input, deps)
}

/// Creates the dispatcher schema for the bot.
///
/// The same handler tree is used in production and in integration tests.
pub fn schema(deps: HandlerDeps, router: Arc<CommandRouter>) -> UpdateHandler<HandlerError> {
    dptree::entry().branch(Update::filter_message().endpoint(move |msg: Message| {
        let deps = deps.clone();
        let router = Arc::clone(&router);
        async move {
            let mut ctx = turn_context(&msg, deps);
            if let Err(e) = router.dispatch(&mut ctx).await {
                log::error!("failed to handle update from chat {}: {}", msg.chat.id, e);
                return Err(Box::new(e) as HandlerError);
            }
            Ok(())
        }
    }))
}
