use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use majordomo::auth::{AuthorizationGate, FriendsRegistry};
use majordomo::conversation::store::ConversationStore;
use majordomo::core::{Settings, init_logger};
use majordomo::router::build_router;
use majordomo::storage::kv::KeyValueStore;
use majordomo::storage::record::RelationStore;
use majordomo::storage::{create_pool, run_migrations};
use majordomo::tasks::{DisabledTaskQueue, RedisTaskQueue, TaskQueue};
use majordomo::telegram::outbound::{Messenger, TelegramMessenger};
use majordomo::telegram::{HandlerDeps, create_bot, schema, setup_bot_commands, webhook_listener};

/// Main entry point
///
/// Everything stateful is constructed here, once, before the first update is
/// served: settings are validated, the logger comes up, migrations run, and
/// the ready stores are handed to the router. A configuration fault aborts
/// the process.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present, then validate them
    let _ = dotenv();
    let settings = Settings::from_env()?;

    init_logger(&settings)?;
    log::info!("starting majordomo (owner {})", settings.owner_id);

    // Database: pool + one-time schema migration before serving anything
    let pool = Arc::new(
        create_pool(&settings.database_path)
            .map_err(|e| anyhow::anyhow!("failed to create database pool: {}", e))?,
    );
    {
        let mut conn = pool.get()?;
        run_migrations(&mut conn)?;
    }
    log::info!("database ready at {}", settings.database_path);

    let kv = KeyValueStore::new(Arc::clone(&pool));
    let relations = RelationStore::new(Arc::clone(&pool));
    let friends = FriendsRegistry::new(kv.clone(), settings.owner_id);
    let gate = AuthorizationGate::new(settings.owner_id, friends.clone());
    let conversations = Arc::new(ConversationStore::new());

    // Task broker is optional; without it submissions are logged and dropped
    let broker: Arc<dyn TaskQueue> = match settings.broker_url.as_deref() {
        Some(url) => match RedisTaskQueue::connect(url).await {
            Ok(queue) => {
                log::info!("task broker connected");
                Arc::new(queue)
            }
            Err(e) => {
                log::warn!("task broker unreachable ({}), submissions disabled", e);
                Arc::new(DisabledTaskQueue)
            }
        },
        None => {
            log::info!("task broker disabled (BROKER_URL unset)");
            Arc::new(DisabledTaskQueue)
        }
    };

    let bot = create_bot(&settings)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("failed to register command menu: {}", e);
    }

    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));
    let deps = HandlerDeps {
        kv,
        relations,
        friends,
        gate,
        messenger,
        broker,
    };

    // Duplicate commands across enabled components fail here, at startup
    let router = Arc::new(build_router(&settings.components, Arc::clone(&conversations))?);
    log::info!("enabled components: {}", settings.components.join(", "));

    let handler = schema(deps, router);

    match &settings.webhook {
        Some(webhook) => {
            log::info!("starting in webhook mode at {}", webhook.public_url);
            let listener = webhook_listener(bot.clone(), webhook).await?;
            Dispatcher::builder(bot, handler)
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            log::info!("WEBHOOK_URL not set, starting in long polling mode");
            // Drop any stale webhook so polling receives updates
            bot.delete_webhook().await?;
            let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
            Dispatcher::builder(bot, handler)
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
    }

    log::info!("dispatcher shut down gracefully");
    Ok(())
}
