//! Command routing
//!
//! Maps top-level command names to a conversation engine or a single-shot
//! handler. Dispatch order per update: the chat's active conversation first,
//! then command routes, then the lowest-priority "sorry" responder. Handlers
//! signal the outcome with [`Routing`]: routing stops at the first route
//! that claims the update, and a guard denial makes the route decline so the
//! update falls through.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::auth::{Decision, Guard};
use crate::conversation::engine::ConversationEngine;
use crate::conversation::store::ConversationStore;
use crate::conversation::{ConversationSpec, TurnContext, config_dialog, friends_dialog};
use crate::core::config::ConfigError;
use crate::core::error::AppResult;
use crate::host;

/// Tagged routing outcome; no control flow by exception
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Routing {
    /// A handler claimed the update; routing stops
    Handled,
    /// Nobody claimed it
    NotMatched,
}

/// A single-shot handler bound to a command
pub type HandlerFn = for<'a> fn(&'a mut TurnContext) -> BoxFuture<'a, AppResult<()>>;

enum RouteKind {
    Conversation(ConversationEngine),
    Handler(HandlerFn),
}

pub struct Route {
    command: &'static str,
    guard: Guard,
    kind: RouteKind,
}

impl Route {
    pub fn conversation(spec: ConversationSpec, store: Arc<ConversationStore>) -> Self {
        let command = spec.command;
        let guard = spec.guard;
        Route {
            command,
            guard,
            kind: RouteKind::Conversation(ConversationEngine::new(spec, store)),
        }
    }

    pub fn handler(command: &'static str, guard: Guard, run: HandlerFn) -> Self {
        Route {
            command,
            guard,
            kind: RouteKind::Handler(run),
        }
    }
}

pub struct CommandRouter {
    routes: Vec<Route>,
    store: Arc<ConversationStore>,
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl CommandRouter {
    /// Builds the router, rejecting duplicate command names up front:
    /// a misconfigured component list fails at startup, not at request time.
    pub fn new(routes: Vec<Route>, store: Arc<ConversationStore>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for route in &routes {
            if !seen.insert(route.command) {
                return Err(ConfigError::DuplicateCommand(route.command.to_string()));
            }
        }
        Ok(Self { routes, store })
    }

    pub async fn dispatch(&self, ctx: &mut TurnContext) -> AppResult<Routing> {
        let key = ctx.key();

        // 1. An in-flight conversation gets the update first, so free-text
        //    answers and sub-commands reach the state that expects them.
        if let Some(active) = self.store.load(&key) {
            let engine = self.routes.iter().find_map(|route| match &route.kind {
                RouteKind::Conversation(engine) if route.command == active.conversation => {
                    Some((route.guard, engine))
                }
                _ => None,
            });
            match engine {
                Some((guard, engine)) => {
                    if ctx
                        .deps
                        .gate
                        .check(guard, ctx.sender, ctx.command_text())
                        .is_allowed()
                    {
                        engine.resume(ctx, active).await?;
                        return Ok(Routing::Handled);
                    }
                }
                None => {
                    // State left behind by a since-disabled component
                    log::warn!(
                        "dropping conversation state for unknown command /{}",
                        active.conversation
                    );
                    self.store.clear(&key);
                }
            }
        }

        // 2. Top-level commands, in registration order
        if ctx.input.is_command() {
            if let Some(token) = ctx.input.first_token() {
                let command = token.to_ascii_lowercase();
                if let Some(route) = self.routes.iter().find(|route| route.command == command) {
                    match ctx
                        .deps
                        .gate
                        .check(route.guard, ctx.sender, ctx.command_text())
                    {
                        Decision::Allow => {
                            match &route.kind {
                                RouteKind::Conversation(engine) => engine.start(ctx).await?,
                                RouteKind::Handler(run) => run(ctx).await?,
                            }
                            return Ok(Routing::Handled);
                        }
                        // Denied: the route declines and the update falls
                        // through. The gate already logged the rejection.
                        Decision::Deny(_) => {}
                    }
                }
            }
        }

        // 3. Fallback responder at lowest priority. Silent for updates that
        //    fail only_real, so bots and senderless updates get no reply.
        match ctx
            .deps
            .gate
            .check(Guard::OnlyReal, ctx.sender, ctx.command_text())
        {
            Decision::Allow => {
                ctx.deps
                    .messenger
                    .send_message(ctx.chat, "Sorry, I don't understand that. Try /help.", None)
                    .await?;
                Ok(Routing::Handled)
            }
            Decision::Deny(_) => Ok(Routing::NotMatched),
        }
    }
}

/// Builds the router from the enabled component list.
pub fn build_router(
    components: &[String],
    store: Arc<ConversationStore>,
) -> Result<CommandRouter, ConfigError> {
    let mut routes = vec![
        Route::handler("start", Guard::OnlyReal, handle_start),
        Route::handler("help", Guard::OnlyReal, handle_help),
    ];
    for component in components {
        match component.as_str() {
            "config" => routes.push(Route::conversation(
                config_dialog::spec(),
                Arc::clone(&store),
            )),
            "friends" => routes.push(Route::conversation(
                friends_dialog::spec(),
                Arc::clone(&store),
            )),
            "host" => routes.push(Route::handler("host", Guard::OnlyFriends, host::handle_host)),
            other => return Err(ConfigError::UnknownComponent(other.to_string())),
        }
    }
    CommandRouter::new(routes, store)
}

fn handle_start(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<()>> {
    Box::pin(async move {
        ctx.deps
            .messenger
            .send_message(
                ctx.chat,
                "Hello! I keep this household running. Try /help to see what I can do.",
                None,
            )
            .await?;
        Ok(())
    })
}

fn handle_help(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<()>> {
    Box::pin(async move {
        ctx.deps
            .messenger
            .send_message(
                ctx.chat,
                "I can:\n\
                 /config - edit my configuration (owner only)\n\
                 /friends - manage who may talk to me (owner only)\n\
                 /host <start|stop|status> - control the game server (friends)\n\
                 /help - this message",
                None,
            )
            .await?;
        Ok(())
    })
}
