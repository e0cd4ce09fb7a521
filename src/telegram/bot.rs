//! Bot initialization
//!
//! Bot instance creation, command menu registration, and the webhook
//! listener. The webhook path is the unguessable segment of the public URL:
//! the listener answers 404 on any other path and 4xx on malformed update
//! JSON, so token mismatches and garbage payloads never reach the router.

use std::time::Duration;

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::update_listeners::{UpdateListener, webhooks};

use crate::core::config::{Settings, WebhookSettings};

/// Outbound Bot API request timeout
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Creates a Bot instance with an explicit HTTP timeout.
pub fn create_bot(settings: &Settings) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;
    Ok(Bot::with_client(settings.bot_token.clone(), client))
}

/// Registers the command menu in the Telegram UI. Best effort: a failure
/// here should not keep the bot from starting.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "say hello"),
        BotCommand::new("help", "what I can do"),
        BotCommand::new("config", "edit my configuration (owner)"),
        BotCommand::new("friends", "manage the friends list (owner)"),
        BotCommand::new("host", "control the game server (friends)"),
    ])
    .await?;

    Ok(())
}

/// Builds the axum-backed webhook listener and registers the webhook with
/// Telegram. Settings were validated at startup, so the re-parses here can
/// only fail if the environment changed under us.
pub async fn webhook_listener(
    bot: Bot,
    webhook: &WebhookSettings,
) -> anyhow::Result<impl UpdateListener<Err = std::convert::Infallible>> {
    let url = url::Url::parse(&webhook.public_url)?;
    let listener = webhooks::axum(bot, webhooks::Options::new(webhook.bind, url)).await?;
    Ok(listener)
}
