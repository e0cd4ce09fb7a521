//! Telegram integration: bot setup, dispatcher schema, outbound messaging

pub mod bot;
pub mod handlers;
pub mod outbound;

pub use bot::{create_bot, setup_bot_commands, webhook_listener};
pub use handlers::{HandlerDeps, HandlerError, schema, turn_context};
pub use outbound::{MessageRef, Messenger, TelegramMessenger};
