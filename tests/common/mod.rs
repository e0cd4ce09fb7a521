//! Shared test fixtures: an in-memory bot wired to a temp database, a
//! recording messenger and a recording task queue.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use teloxide::types::InlineKeyboardMarkup;

use majordomo::auth::{AuthorizationGate, FriendsRegistry, Sender};
use majordomo::conversation::store::{ConversationKey, ConversationState, ConversationStore};
use majordomo::conversation::{TurnContext, TurnInput};
use majordomo::core::error::AppResult;
use majordomo::router::{CommandRouter, Routing, build_router};
use majordomo::storage::kv::KeyValueStore;
use majordomo::storage::record::RelationStore;
use majordomo::storage::{create_pool, run_migrations};
use majordomo::tasks::{TaskQueue, TaskSpec};
use majordomo::telegram::HandlerDeps;
use majordomo::telegram::outbound::{MessageRef, Messenger};

pub const OWNER: i64 = 1000;

/// Messenger double that records every outbound call
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub edits: Mutex<Vec<(MessageRef, String)>>,
    pub deleted: Mutex<Vec<MessageRef>>,
    next_id: AtomicI32,
}

impl RecordingMessenger {
    pub fn last_sent(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, text)| text.clone())
    }

    pub fn last_edit(&self) -> Option<String> {
        self.edits.lock().unwrap().last().map(|(_, text)| text.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(
        &self,
        chat: i64,
        text: &str,
        _markup: Option<InlineKeyboardMarkup>,
    ) -> AppResult<MessageRef> {
        let message = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().unwrap().push((chat, text.to_string()));
        Ok(MessageRef { chat, message })
    }

    async fn edit_message_text(
        &self,
        target: MessageRef,
        text: &str,
        _markup: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        self.edits.lock().unwrap().push((target, text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, target: MessageRef) -> AppResult<()> {
        self.deleted.lock().unwrap().push(target);
        Ok(())
    }
}

/// Task queue double that records every submission
#[derive(Default)]
pub struct RecordingQueue {
    pub submitted: Mutex<Vec<TaskSpec>>,
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn submit(&self, task: TaskSpec) -> AppResult<()> {
        self.submitted.lock().unwrap().push(task);
        Ok(())
    }
}

/// A fully wired bot against a temp database
pub struct TestBot {
    pub deps: HandlerDeps,
    pub router: CommandRouter,
    pub store: Arc<ConversationStore>,
    pub messenger: Arc<RecordingMessenger>,
    pub queue: Arc<RecordingQueue>,
    pub kv: KeyValueStore,
    pub friends: FriendsRegistry,
    pub relations: RelationStore,
    _dir: tempfile::TempDir,
}

pub fn test_bot() -> TestBot {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.sqlite");
    let pool = Arc::new(create_pool(path.to_str().unwrap()).unwrap());
    {
        let mut conn = pool.get().unwrap();
        run_migrations(&mut conn).unwrap();
    }

    let kv = KeyValueStore::new(Arc::clone(&pool));
    let relations = RelationStore::new(Arc::clone(&pool));
    let friends = FriendsRegistry::new(kv.clone(), OWNER);
    let gate = AuthorizationGate::new(OWNER, friends.clone());
    let messenger = Arc::new(RecordingMessenger::default());
    let queue = Arc::new(RecordingQueue::default());

    let deps = HandlerDeps {
        kv: kv.clone(),
        relations: relations.clone(),
        friends: friends.clone(),
        gate,
        messenger: messenger.clone() as Arc<dyn Messenger>,
        broker: queue.clone() as Arc<dyn TaskQueue>,
    };

    let store = Arc::new(ConversationStore::new());
    let components = vec![
        "config".to_string(),
        "friends".to_string(),
        "host".to_string(),
    ];
    let router = build_router(&components, Arc::clone(&store)).unwrap();

    TestBot {
        deps,
        router,
        store,
        messenger,
        queue,
        kv,
        friends,
        relations,
        _dir: dir,
    }
}

impl TestBot {
    pub async fn send(&self, chat: i64, sender: Option<Sender>, input: TurnInput) -> Routing {
        let mut ctx = TurnContext::new(chat, sender, input, self.deps.clone());
        self.router.dispatch(&mut ctx).await.unwrap()
    }

    /// One text turn from a human sender
    pub async fn say(&self, chat: i64, sender_id: i64, text: &str) -> Routing {
        self.send(
            chat,
            Some(Sender {
                id: sender_id,
                is_bot: false,
            }),
            TurnInput::from_text(text),
        )
        .await
    }

    /// One contact-card turn from a human sender
    pub async fn share_contact(&self, chat: i64, sender_id: i64, contact_id: i64) -> Routing {
        self.send(
            chat,
            Some(Sender {
                id: sender_id,
                is_bot: false,
            }),
            TurnInput::from_contact(contact_id),
        )
        .await
    }

    pub fn state(&self, chat: i64) -> Option<ConversationState> {
        self.store.load(&ConversationKey { chat, user: None })
    }
}
