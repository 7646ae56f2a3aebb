use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bud_core::config::Config;
use bud_core::longtask::TaskQueue;
use bud_core::paths;
use bud_core::webhook::{ChatWebhook, HttpWebhook};
use bud_core::Bot;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
    pub queue: Arc<TaskQueue>,
    pub webhook: Arc<dyn ChatWebhook>,
}

impl AppState {
    pub fn new(bot: Arc<Bot>, queue: Arc<TaskQueue>, webhook: Arc<dyn ChatWebhook>) -> Self {
        Self {
            bot,
            queue,
            webhook,
        }
    }

    /// Open the bot's stores and task queue under `root`, posting long-task
    /// results over HTTP.
    pub fn open(root: &Path) -> bud_core::Result<Self> {
        let config = Config::load(root)?;
        for w in config.validate() {
            tracing::warn!(level = ?w.level, "config: {}", w.message);
        }
        let queue = Arc::new(TaskQueue::open(&paths::queue_db(root))?);
        let webhook = Arc::new(HttpWebhook::new(Duration::from_secs(
            config.webhook.timeout_secs,
        )));
        let bot = Bot::open(root, config, queue.clone())?;
        Ok(Self::new(Arc::new(bot), queue, webhook))
    }
}
