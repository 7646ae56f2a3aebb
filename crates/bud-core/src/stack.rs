//! Stack-orchestration collaborator.
//!
//! A stack is the unit of infrastructure for one service in one
//! environment and region. Deploys create the stack on first use and update
//! it afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BudError, Result};
use crate::store::{decode, TableStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackStatus {
    CreateComplete,
    UpdateInProgress,
    UpdateComplete,
    Failed,
}

impl StackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StackStatus::CreateComplete => "CREATE_COMPLETE",
            StackStatus::UpdateInProgress => "UPDATE_IN_PROGRESS",
            StackStatus::UpdateComplete => "UPDATE_COMPLETE",
            StackStatus::Failed => "FAILED",
        }
    }

    pub fn is_stable(self) -> bool {
        matches!(self, StackStatus::CreateComplete | StackStatus::UpdateComplete)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSummary {
    pub name: String,
    pub region: String,
    pub status: StackStatus,
    /// Template parameters, e.g. `ImageTag`.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackRequest {
    pub name: String,
    pub region: String,
    pub parameters: BTreeMap<String, String>,
}

/// Stack name for a service in an environment.
pub fn stack_name(service: &str, env: &str) -> String {
    format!("{service}-{env}")
}

pub trait StackOrchestrator: Send + Sync {
    fn describe(&self, name: &str, region: &str) -> Result<Option<StackSummary>>;

    fn create(&self, request: &StackRequest) -> Result<StackSummary>;

    fn update(&self, request: &StackRequest) -> Result<StackSummary>;

    /// Create the stack if it does not exist yet, otherwise update it.
    fn apply(&self, request: &StackRequest) -> Result<StackSummary> {
        match self.describe(&request.name, &request.region)? {
            Some(_) => self.update(request),
            None => self.create(request),
        }
    }
}

pub const STACKS: &str = "stacks";

/// Orchestrator that keeps stack state in the table store and completes
/// every operation immediately.
pub struct TableStacks {
    store: Arc<dyn TableStore>,
}

impl TableStacks {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    fn key(name: &str, region: &str) -> String {
        format!("{region}/{name}")
    }

    fn write(&self, request: &StackRequest, status: StackStatus) -> Result<StackSummary> {
        let mut outputs = BTreeMap::new();
        outputs.insert(
            "Endpoint".to_string(),
            format!("https://{}.{}.example.internal", request.name, request.region),
        );
        let summary = StackSummary {
            name: request.name.clone(),
            region: request.region.clone(),
            status,
            parameters: request.parameters.clone(),
            outputs,
            updated_at: Utc::now(),
        };
        self.store.put(
            STACKS,
            &Self::key(&request.name, &request.region),
            &serde_json::to_value(&summary)?,
        )?;
        Ok(summary)
    }
}

impl StackOrchestrator for TableStacks {
    fn describe(&self, name: &str, region: &str) -> Result<Option<StackSummary>> {
        let key = Self::key(name, region);
        match self.store.get(STACKS, &key)? {
            Some(v) => decode(STACKS, &key, v).map(Some),
            None => Ok(None),
        }
    }

    fn create(&self, request: &StackRequest) -> Result<StackSummary> {
        if self.describe(&request.name, &request.region)?.is_some() {
            return Err(BudError::User(format!(
                "stack {} already exists in {}",
                request.name, request.region
            )));
        }
        self.write(request, StackStatus::CreateComplete)
    }

    fn update(&self, request: &StackRequest) -> Result<StackSummary> {
        if self.describe(&request.name, &request.region)?.is_none() {
            return Err(BudError::StackNotFound(request.name.clone()));
        }
        self.write(request, StackStatus::UpdateComplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTableStore;

    fn stacks() -> TableStacks {
        TableStacks::new(Arc::new(MemoryTableStore::new()))
    }

    fn request(tag: &str) -> StackRequest {
        let mut parameters = BTreeMap::new();
        parameters.insert("ImageTag".to_string(), tag.to_string());
        StackRequest {
            name: stack_name("api", "dev"),
            region: "us-east-1".into(),
            parameters,
        }
    }

    #[test]
    fn apply_creates_then_updates() {
        let stacks = stacks();
        let created = stacks.apply(&request("1.0.0")).unwrap();
        assert_eq!(created.status, StackStatus::CreateComplete);
        let updated = stacks.apply(&request("1.0.1")).unwrap();
        assert_eq!(updated.status, StackStatus::UpdateComplete);
        assert_eq!(updated.parameters["ImageTag"], "1.0.1");
        assert!(updated.status.is_stable());
    }

    #[test]
    fn stacks_are_per_region() {
        let stacks = stacks();
        stacks.apply(&request("1.0.0")).unwrap();
        assert!(stacks.describe("api-dev", "us-west-2").unwrap().is_none());
        assert!(stacks.describe("api-dev", "us-east-1").unwrap().is_some());
    }

    #[test]
    fn update_of_missing_stack_fails() {
        let stacks = stacks();
        assert!(matches!(
            stacks.update(&request("1.0.0")),
            Err(BudError::StackNotFound(_))
        ));
    }

    #[test]
    fn status_serializes_like_the_provider() {
        assert_eq!(
            serde_json::to_string(&StackStatus::UpdateComplete).unwrap(),
            "\"UPDATE_COMPLETE\""
        );
        assert_eq!(StackStatus::UpdateInProgress.as_str(), "UPDATE_IN_PROGRESS");
    }
}
