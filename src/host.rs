//! Game-server control
//!
//! `/host <start|stop|status>` records the request as a [`HostJob`] and hands
//! it to the external worker through the task broker. The worker reports back
//! to the chat on its own; nothing here waits for it.

use futures_util::future::BoxFuture;
use rusqlite::Row;
use rusqlite::types::Value;
use serde_json::json;

use crate::conversation::TurnContext;
use crate::core::error::AppResult;
use crate::storage::record::{FieldSpec, Record};
use crate::tasks::TaskSpec;

/// Actions the worker understands
pub const HOST_ACTIONS: [&str; 3] = ["start", "stop", "status"];

const USAGE: &str = "Usage: /host <start|stop|status>";

/// One recorded control request for the game server
#[derive(Debug, Clone)]
pub struct HostJob {
    pub id: Option<i64>,
    pub chat_id: i64,
    pub action: String,
    /// `queued` on creation; the worker owns it afterwards
    pub status: String,
    pub requested_at: String,
}

impl HostJob {
    pub fn new(chat_id: i64, action: &str) -> Self {
        Self {
            id: None,
            chat_id,
            action: action.to_string(),
            status: "queued".to_string(),
            requested_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl Record for HostJob {
    const TABLE: &'static str = "host_job";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec {
            name: "chat_id",
            sql_type: "INTEGER",
            default: None,
        },
        FieldSpec {
            name: "action",
            sql_type: "TEXT",
            default: None,
        },
        FieldSpec {
            name: "status",
            sql_type: "TEXT",
            default: Some("'queued'"),
        },
        FieldSpec {
            name: "requested_at",
            sql_type: "TEXT",
            default: None,
        },
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.chat_id),
            Value::Text(self.action.clone()),
            Value::Text(self.status.clone()),
            Value::Text(self.requested_at.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(HostJob {
            id: Some(row.get(0)?),
            chat_id: row.get(1)?,
            action: row.get(2)?,
            status: row.get(3)?,
            requested_at: row.get(4)?,
        })
    }
}

/// Single-shot handler for /host
pub fn handle_host(ctx: &mut TurnContext) -> BoxFuture<'_, AppResult<()>> {
    Box::pin(async move {
        let action = match ctx.input.arg(1).map(str::to_ascii_lowercase) {
            Some(action) if HOST_ACTIONS.contains(&action.as_str()) => action,
            _ => {
                ctx.deps.messenger.send_message(ctx.chat, USAGE, None).await?;
                return Ok(());
            }
        };

        let mut job = HostJob::new(ctx.chat, &action);
        ctx.deps.relations.commit(&mut job)?;
        let job_id = job.id.unwrap_or_default();

        if !ctx.deps.broker.is_enabled() {
            log::warn!("host job {} recorded but no task broker is configured", job_id);
            ctx.deps
                .messenger
                .send_message(
                    ctx.chat,
                    "I noted the request, but no control worker is configured.",
                    None,
                )
                .await?;
            return Ok(());
        }

        let task = TaskSpec {
            name: format!("host.{action}"),
            payload: json!({
                "job_id": job_id,
                "chat_id": ctx.chat,
                "action": action,
            }),
        };
        if let Err(e) = ctx.deps.broker.submit(task).await {
            log::error!("failed to submit host job {}: {}", job_id, e);
            ctx.deps
                .messenger
                .send_message(
                    ctx.chat,
                    "I recorded the request but couldn't reach the control worker.",
                    None,
                )
                .await?;
            return Ok(());
        }

        ctx.deps
            .messenger
            .send_message(
                ctx.chat,
                &format!("Queued {action} for the game server (job #{job_id})."),
                None,
            )
            .await?;
        Ok(())
    })
}
