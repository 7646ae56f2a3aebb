//! Long-running work relayed out of the request path.
//!
//! A handler that cannot answer within the chat platform's response
//! deadline submits a [`LongTaskRequest`] through a [`LongTaskRelay`] and
//! acknowledges at once. A worker later runs the task and posts the result
//! to the request's `response_url`.
//!
//! Delivery is at-least-once: the production relay is the persistent
//! [`TaskQueue`], which retries failed deliveries up to a configured bound
//! and records every task's status.

pub mod queue;
pub mod worker;

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::CommandName;
use crate::error::Result;
use crate::response::SlackResponse;

pub use queue::TaskQueue;
pub use worker::{drain, process, process_next, TaskOutcome};

/// What a long task does, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum LongTaskKind {
    Deploy {
        service: String,
        env: String,
        region: String,
        version: String,
    },
    TestResults {
        service: String,
        build: u64,
    },
}

impl LongTaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            LongTaskKind::Deploy { .. } => "deploy",
            LongTaskKind::TestResults { .. } => "test_results",
        }
    }

    /// The chat command that queues this kind of task.
    pub fn origin(&self) -> (CommandName, &'static str) {
        match self {
            LongTaskKind::Deploy { .. } => (CommandName::Deploy, "start"),
            LongTaskKind::TestResults { .. } => (CommandName::Test, "results"),
        }
    }
}

/// The serialized payload handed to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongTaskRequest {
    pub task: LongTaskKind,
    /// Where the result is posted. Empty means nobody is listening.
    #[serde(default)]
    pub response_url: String,
    #[serde(default)]
    pub requested_by: String,
}

// ---------------------------------------------------------------------------
// TaskStatus / LongTask
// ---------------------------------------------------------------------------

/// Lifecycle of a queued task.
///
/// Transitions: `Pending → Running → Completed | Pending (retry) | Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed { reason: String },
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTask {
    pub id: Uuid,
    pub request: LongTaskRequest,
    pub status: TaskStatus,
    /// Number of times a worker has claimed the task.
    pub attempts: u32,
    /// Result produced by the first successful run. Retries only redeliver it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<SlackResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LongTask {
    pub fn new(request: LongTaskRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request,
            status: TaskStatus::Pending,
            attempts: 0,
            reply: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// LongTaskRelay
// ---------------------------------------------------------------------------

pub trait LongTaskRelay: Send + Sync {
    /// Hand `request` off for asynchronous execution.
    fn submit(&self, request: LongTaskRequest) -> Result<Uuid>;
}

/// Relay that only records submissions.
#[derive(Default)]
pub struct RecordingRelay {
    submitted: Mutex<Vec<LongTaskRequest>>,
}

impl RecordingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<LongTaskRequest> {
        self.submitted
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl LongTaskRelay for RecordingRelay {
    fn submit(&self, request: LongTaskRequest) -> Result<Uuid> {
        if let Ok(mut s) = self.submitted.lock() {
            s.push(request);
        }
        Ok(Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_json_names_the_task() {
        let req = LongTaskRequest {
            task: LongTaskKind::TestResults {
                service: "api".into(),
                build: 42,
            },
            response_url: "https://hooks.example/x".into(),
            requested_by: "U1".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["task"]["name"], "test_results");
        assert_eq!(json["task"]["build"], 42);
        let back: LongTaskRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn recording_relay_keeps_order() {
        let relay = RecordingRelay::new();
        for build in [1, 2] {
            relay
                .submit(LongTaskRequest {
                    task: LongTaskKind::TestResults {
                        service: "api".into(),
                        build,
                    },
                    response_url: String::new(),
                    requested_by: String::new(),
                })
                .unwrap();
        }
        let builds: Vec<u64> = relay
            .submitted()
            .into_iter()
            .map(|r| match r.task {
                LongTaskKind::TestResults { build, .. } => build,
                _ => 0,
            })
            .collect();
        assert_eq!(builds, vec![1, 2]);
    }
}
