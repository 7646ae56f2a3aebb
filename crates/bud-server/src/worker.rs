//! Background delivery of long-task results.

use std::time::Duration;

use bud_core::longtask::{process_next, TaskStatus};
use tokio::task::JoinHandle;

use crate::state::AppState;

/// Process pending tasks until the queue is empty or a delivery fails.
///
/// A failed delivery ends the tick so its retry waits for the next one.
/// Returns the number of tasks processed.
pub fn tick(state: &AppState) -> bud_core::Result<usize> {
    let mut processed = 0;
    while let Some(outcome) = process_next(&state.bot, &state.queue, state.webhook.as_ref())? {
        processed += 1;
        if outcome.status != TaskStatus::Completed {
            break;
        }
    }
    Ok(processed)
}

/// Spawn the queue worker: recover interrupted tasks, then tick forever.
///
/// Returns `None` outside a Tokio runtime.
pub fn spawn_worker(state: AppState) -> Option<JoinHandle<()>> {
    if tokio::runtime::Handle::try_current().is_err() {
        return None;
    }
    let interval = Duration::from_millis(state.bot.config.long_task.tick_ms.max(10));

    Some(tokio::spawn(async move {
        let queue = state.queue.clone();
        match tokio::task::spawn_blocking(move || queue.startup_recovery()).await {
            Ok(Ok(n)) => tracing::debug!(recovered = n, "task queue ready"),
            Ok(Err(e)) => tracing::error!(error = %e, "task queue recovery failed"),
            Err(e) => tracing::error!(error = %e, "task queue recovery panicked"),
        }

        loop {
            let s = state.clone();
            match tokio::task::spawn_blocking(move || tick(&s)).await {
                Ok(Ok(0)) => {}
                Ok(Ok(n)) => tracing::debug!(processed = n, "worker tick"),
                Ok(Err(e)) => tracing::error!(error = %e, "worker tick failed"),
                Err(e) => tracing::error!(error = %e, "worker tick panicked"),
            }
            tokio::time::sleep(interval).await;
        }
    }))
}
