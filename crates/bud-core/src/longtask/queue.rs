//! Persistent long-task queue on redb.
//!
//! # Table design
//!
//! ```text
//! tasks     seq: u64        -> JSON LongTask
//! task_ids  uuid: 16 bytes  -> seq
//! pending   seq: u64        -> ()
//! meta      "next_seq"      -> u64
//! ```
//!
//! `seq` is handed out by `enqueue` inside the same write transaction, so
//! key order is submission order even within one millisecond. `pending`
//! holds exactly the tasks whose status is `Pending`; its first key is the
//! next task to claim. Lookups by id go through `task_ids` and never scan.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableTable, Table, TableDefinition};
use uuid::Uuid;

use super::{LongTask, LongTaskRelay, LongTaskRequest, TaskStatus};
use crate::error::{BudError, Result};
use crate::response::SlackResponse;

const TASKS: TableDefinition<u64, &[u8]> = TableDefinition::new("tasks");
const TASK_IDS: TableDefinition<&[u8], u64> = TableDefinition::new("task_ids");
const PENDING: TableDefinition<u64, ()> = TableDefinition::new("pending");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_SEQ: &str = "next_seq";

fn queue_err(e: impl std::fmt::Display) -> BudError {
    BudError::Queue(e.to_string())
}

fn decode(raw: &[u8]) -> Result<LongTask> {
    serde_json::from_slice(raw).map_err(queue_err)
}

fn not_found(id: Uuid) -> BudError {
    BudError::TaskNotFound(id.to_string())
}

/// Write `task` at `seq` and keep `pending` in step with its status.
fn store(
    tasks: &mut Table<'_, u64, &'static [u8]>,
    pending: &mut Table<'_, u64, ()>,
    seq: u64,
    task: &LongTask,
) -> Result<()> {
    let value = serde_json::to_vec(task).map_err(queue_err)?;
    tasks.insert(seq, value.as_slice()).map_err(queue_err)?;
    if task.status == TaskStatus::Pending {
        pending.insert(seq, ()).map_err(queue_err)?;
    } else {
        pending.remove(seq).map_err(queue_err)?;
    }
    Ok(())
}

fn load(tasks: &Table<'_, u64, &'static [u8]>, seq: u64) -> Result<Option<LongTask>> {
    match tasks.get(seq).map_err(queue_err)? {
        Some(raw) => decode(raw.value()).map(Some),
        None => Ok(None),
    }
}

fn mark_claimed(task: &mut LongTask) {
    task.status = TaskStatus::Running;
    task.attempts += 1;
    task.updated_at = Utc::now();
}

pub struct TaskQueue {
    db: Database,
}

impl TaskQueue {
    /// Open or create the queue database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(queue_err)?;
        let wt = db.begin_write().map_err(queue_err)?;
        wt.open_table(TASKS).map_err(queue_err)?;
        wt.open_table(TASK_IDS).map_err(queue_err)?;
        wt.open_table(PENDING).map_err(queue_err)?;
        wt.open_table(META).map_err(queue_err)?;
        wt.commit().map_err(queue_err)?;
        Ok(Self { db })
    }

    fn seq_of(&self, id: Uuid) -> Result<u64> {
        let rt = self.db.begin_read().map_err(queue_err)?;
        let ids = rt.open_table(TASK_IDS).map_err(queue_err)?;
        let seq = ids.get(id.as_bytes().as_slice()).map_err(queue_err)?;
        seq.map(|g| g.value()).ok_or_else(|| not_found(id))
    }

    /// Load task `id`, apply `f` and write it back in one transaction.
    fn update(&self, id: Uuid, f: impl FnOnce(&mut LongTask)) -> Result<LongTask> {
        let seq = self.seq_of(id)?;
        let wt = self.db.begin_write().map_err(queue_err)?;
        let task = {
            let mut tasks = wt.open_table(TASKS).map_err(queue_err)?;
            let mut pending = wt.open_table(PENDING).map_err(queue_err)?;
            let mut task = load(&tasks, seq)?.ok_or_else(|| not_found(id))?;
            f(&mut task);
            task.updated_at = Utc::now();
            store(&mut tasks, &mut pending, seq, &task)?;
            task
        };
        wt.commit().map_err(queue_err)?;
        Ok(task)
    }

    /// Claim the pending task at `seq`, if it is still pending.
    fn claim_seq(&self, seq: Option<u64>) -> Result<Option<LongTask>> {
        let wt = self.db.begin_write().map_err(queue_err)?;
        let claimed = {
            let mut pending = wt.open_table(PENDING).map_err(queue_err)?;
            let seq = match seq {
                Some(seq) => pending.get(seq).map_err(queue_err)?.map(|_| seq),
                None => pending.first().map_err(queue_err)?.map(|(k, _)| k.value()),
            };
            match seq {
                None => None,
                Some(seq) => {
                    let mut tasks = wt.open_table(TASKS).map_err(queue_err)?;
                    match load(&tasks, seq)? {
                        Some(mut task) => {
                            mark_claimed(&mut task);
                            store(&mut tasks, &mut pending, seq, &task)?;
                            Some(task)
                        }
                        None => {
                            pending.remove(seq).map_err(queue_err)?;
                            None
                        }
                    }
                }
            }
        };
        wt.commit().map_err(queue_err)?;
        Ok(claimed)
    }

    pub fn enqueue(&self, request: LongTaskRequest) -> Result<LongTask> {
        let task = LongTask::new(request);
        let wt = self.db.begin_write().map_err(queue_err)?;
        {
            let mut meta = wt.open_table(META).map_err(queue_err)?;
            let seq = meta
                .get(NEXT_SEQ)
                .map_err(queue_err)?
                .map(|g| g.value())
                .unwrap_or(0);
            meta.insert(NEXT_SEQ, seq + 1).map_err(queue_err)?;

            let mut ids = wt.open_table(TASK_IDS).map_err(queue_err)?;
            ids.insert(task.id.as_bytes().as_slice(), seq)
                .map_err(queue_err)?;

            let mut tasks = wt.open_table(TASKS).map_err(queue_err)?;
            let mut pending = wt.open_table(PENDING).map_err(queue_err)?;
            store(&mut tasks, &mut pending, seq, &task)?;
        }
        wt.commit().map_err(queue_err)?;
        tracing::info!(id = %task.id, task = task.request.task.name(), "long task queued");
        Ok(task)
    }

    pub fn get(&self, id: Uuid) -> Result<LongTask> {
        let seq = self.seq_of(id)?;
        let rt = self.db.begin_read().map_err(queue_err)?;
        let tasks = rt.open_table(TASKS).map_err(queue_err)?;
        let raw = tasks.get(seq).map_err(queue_err)?.ok_or_else(|| not_found(id))?;
        decode(raw.value())
    }

    /// Mark the oldest pending task `Running` and return it.
    pub fn claim_next(&self) -> Result<Option<LongTask>> {
        self.claim_seq(None)
    }

    /// Mark task `id` `Running` and return it. `None` when it is not pending.
    pub fn claim(&self, id: Uuid) -> Result<Option<LongTask>> {
        self.claim_seq(Some(self.seq_of(id)?))
    }

    /// Keep the result of a run so that retries redeliver instead of rerunning.
    pub fn store_reply(&self, id: Uuid, reply: &SlackResponse) -> Result<()> {
        self.update(id, |task| task.reply = Some(reply.clone()))?;
        Ok(())
    }

    pub fn complete(&self, id: Uuid) -> Result<()> {
        self.update(id, |task| task.status = TaskStatus::Completed)?;
        Ok(())
    }

    /// Return a failed attempt to `Pending`, or mark it `Failed` once
    /// `max_attempts` claims have been used. Returns the new status.
    pub fn retry_or_fail(&self, id: Uuid, reason: &str, max_attempts: u32) -> Result<TaskStatus> {
        let task = self.update(id, |task| {
            task.last_error = Some(reason.to_string());
            task.status = if task.attempts >= max_attempts {
                TaskStatus::Failed {
                    reason: reason.to_string(),
                }
            } else {
                TaskStatus::Pending
            };
        })?;
        Ok(task.status)
    }

    /// Return tasks left `Running` by a previous process to `Pending`.
    ///
    /// Returns the number of tasks recovered.
    pub fn startup_recovery(&self) -> Result<u32> {
        let wt = self.db.begin_write().map_err(queue_err)?;
        let count = {
            let mut tasks = wt.open_table(TASKS).map_err(queue_err)?;
            let mut pending = wt.open_table(PENDING).map_err(queue_err)?;
            let mut running = Vec::new();
            for entry in tasks.iter().map_err(queue_err)? {
                let (k, v) = entry.map_err(queue_err)?;
                let task = decode(v.value())?;
                if task.status == TaskStatus::Running {
                    running.push((k.value(), task));
                }
            }
            for (seq, task) in &mut running {
                task.status = TaskStatus::Pending;
                task.updated_at = Utc::now();
                store(&mut tasks, &mut pending, *seq, task)?;
            }
            running.len() as u32
        };
        wt.commit().map_err(queue_err)?;
        if count > 0 {
            tracing::warn!(count, "requeued long tasks interrupted by a restart");
        }
        Ok(count)
    }

    /// All tasks, newest first.
    pub fn list(&self) -> Result<Vec<LongTask>> {
        let rt = self.db.begin_read().map_err(queue_err)?;
        let table = rt.open_table(TASKS).map_err(queue_err)?;
        let mut tasks = Vec::new();
        for entry in table.iter().map_err(queue_err)?.rev() {
            let (_, v) = entry.map_err(queue_err)?;
            tasks.push(decode(v.value())?);
        }
        Ok(tasks)
    }
}

impl LongTaskRelay for TaskQueue {
    fn submit(&self, request: LongTaskRequest) -> Result<Uuid> {
        Ok(self.enqueue(request)?.id)
    }
}
