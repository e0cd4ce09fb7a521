//! Task broker submission
//!
//! Long-running work (like poking the remote game server) is not done inside
//! a request; it is handed to an external worker through the broker with a
//! single fire-and-forget push. The core keeps no completion feedback loop;
//! the worker messages the user directly when it is done.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use serde::Serialize;

use crate::core::error::AppResult;

/// Redis list the worker consumes from
pub const TASK_LIST_KEY: &str = "majordomo:tasks";

/// One unit of work for the external worker
#[derive(Clone, Debug, Serialize)]
pub struct TaskSpec {
    pub name: String,
    pub payload: serde_json::Value,
}

/// Fire-and-forget task submission
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn submit(&self, task: TaskSpec) -> AppResult<()>;

    /// False when no broker is configured and submissions are dropped
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Pushes JSON task payloads onto a redis list
pub struct RedisTaskQueue {
    conn: MultiplexedConnection,
}

impl RedisTaskQueue {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn submit(&self, task: TaskSpec) -> AppResult<()> {
        let body = serde_json::to_string(&task)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(TASK_LIST_KEY, body).await?;
        log::debug!("submitted task {}", task.name);
        Ok(())
    }
}

/// Stand-in when BROKER_URL is unset: submissions are logged and dropped.
pub struct DisabledTaskQueue;

#[async_trait]
impl TaskQueue for DisabledTaskQueue {
    async fn submit(&self, task: TaskSpec) -> AppResult<()> {
        log::debug!("task broker disabled, dropping task {}", task.name);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
