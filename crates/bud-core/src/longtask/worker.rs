//! Draining the task queue.

use uuid::Uuid;

use super::{LongTask, TaskQueue, TaskStatus};
use crate::dispatch::Bot;
use crate::error::Result;
use crate::webhook::ChatWebhook;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub id: Uuid,
    pub status: TaskStatus,
}

/// Claim the oldest pending task, run it once, and deliver its reply.
///
/// A failed delivery puts the task back in the queue until
/// `long_task.max_attempts` is reached. Returns `None` when nothing is
/// pending.
pub fn process_next(
    bot: &Bot,
    queue: &TaskQueue,
    webhook: &dyn ChatWebhook,
) -> Result<Option<TaskOutcome>> {
    match queue.claim_next()? {
        Some(task) => deliver(bot, queue, webhook, task).map(Some),
        None => Ok(None),
    }
}

/// Like [`process_next`], for one specific task. Returns `None` when `id`
/// is not pending.
pub fn process(
    bot: &Bot,
    queue: &TaskQueue,
    webhook: &dyn ChatWebhook,
    id: Uuid,
) -> Result<Option<TaskOutcome>> {
    match queue.claim(id)? {
        Some(task) => deliver(bot, queue, webhook, task).map(Some),
        None => Ok(None),
    }
}

fn deliver(
    bot: &Bot,
    queue: &TaskQueue,
    webhook: &dyn ChatWebhook,
    task: LongTask,
) -> Result<TaskOutcome> {
    let reply = match task.reply {
        Some(reply) => reply,
        None => {
            let reply = bot.run_long_task(&task.request);
            queue.store_reply(task.id, &reply)?;
            reply
        }
    };

    let url = &task.request.response_url;
    if url.is_empty() {
        tracing::info!(id = %task.id, "long task has no response url; result kept in queue");
        queue.complete(task.id)?;
        return Ok(TaskOutcome {
            id: task.id,
            status: TaskStatus::Completed,
        });
    }

    let status = match webhook.post(url, &reply) {
        Ok(()) => {
            queue.complete(task.id)?;
            TaskStatus::Completed
        }
        Err(e) => {
            tracing::warn!(id = %task.id, attempt = task.attempts, error = %e, "delivering long task result failed");
            queue.retry_or_fail(task.id, &e.to_string(), bot.config.long_task.max_attempts)?
        }
    };
    Ok(TaskOutcome {
        id: task.id,
        status,
    })
}

/// Process tasks until none is pending.
pub fn drain(bot: &Bot, queue: &TaskQueue, webhook: &dyn ChatWebhook) -> Result<Vec<TaskOutcome>> {
    let mut outcomes = Vec::new();
    while let Some(outcome) = process_next(bot, queue, webhook)? {
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
