pub mod commands;
pub mod config;
pub mod confirm;
pub mod init;
pub mod invoke;
pub mod run;
pub mod seed;
pub mod serve;
pub mod tasks;

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use bud_core::config::Config;
use bud_core::longtask::{self, LongTaskRelay, LongTaskRequest, TaskQueue, TaskStatus};
use bud_core::webhook::RecordingWebhook;
use bud_core::{paths, Bot, BudError};
use uuid::Uuid;

use crate::output::print_reply;

/// Where locally-run long tasks "post" their result.
pub const LOCAL_RESPONSE_URL: &str = "local://bud";

fn open_queue(root: &Path) -> anyhow::Result<(Config, Arc<TaskQueue>)> {
    let config = Config::load(root).context("failed to load config (run `bud init` first)")?;
    let queue = Arc::new(
        TaskQueue::open(&paths::queue_db(root)).context("failed to open task queue")?,
    );
    Ok((config, queue))
}

/// Open the bot against the stores under `root`, relaying long tasks into
/// the on-disk queue.
pub fn open_bot(root: &Path) -> anyhow::Result<(Bot, Arc<TaskQueue>)> {
    let (config, queue) = open_queue(root)?;
    let bot = Bot::open(root, config, queue.clone()).context("failed to open bot stores")?;
    Ok((bot, queue))
}

/// Queues long tasks like [`TaskQueue`] and remembers which ones this
/// process submitted.
struct SessionRelay {
    queue: Arc<TaskQueue>,
    submitted: Mutex<Vec<Uuid>>,
}

impl LongTaskRelay for SessionRelay {
    fn submit(&self, request: LongTaskRequest) -> bud_core::Result<Uuid> {
        let id = self.queue.submit(request)?;
        self.submitted
            .lock()
            .map_err(|_| BudError::Queue("session relay lock poisoned".into()))?
            .push(id);
        Ok(id)
    }
}

/// A bot whose long tasks can be run before the process exits.
pub struct Session {
    pub bot: Bot,
    queue: Arc<TaskQueue>,
    relay: Arc<SessionRelay>,
}

impl Session {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let (config, queue) = open_queue(root)?;
        let relay = Arc::new(SessionRelay {
            queue: queue.clone(),
            submitted: Mutex::new(Vec::new()),
        });
        let bot = Bot::open(root, config, relay.clone()).context("failed to open bot stores")?;
        Ok(Self { bot, queue, relay })
    }

    /// Run the long tasks queued through this session and print what they
    /// would have posted. Tasks queued by anyone else are left for their
    /// own worker.
    pub fn deliver_submitted(&self, json: bool) -> anyhow::Result<()> {
        let ids = std::mem::take(
            &mut *self
                .relay
                .submitted
                .lock()
                .map_err(|_| anyhow::anyhow!("session relay lock poisoned"))?,
        );
        let webhook = RecordingWebhook::new();
        for id in ids {
            while let Some(outcome) = longtask::process(&self.bot, &self.queue, &webhook, id)? {
                if outcome.status != TaskStatus::Pending {
                    break;
                }
            }
        }
        for (_, reply) in webhook.posted() {
            print_reply(&reply, json)?;
        }
        Ok(())
    }
}
