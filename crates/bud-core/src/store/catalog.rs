//! Typed access to the bot's well-known tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{decode, TableStore};
use crate::error::{BudError, Result};
use crate::types::Role;

pub const SERVICES: &str = "services";
pub const ROLES: &str = "roles";
pub const DEPLOYS: &str = "deploys";

/// Per-service configuration row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    /// How the service is built, e.g. `docker` or `zip`.
    #[serde(default)]
    pub build_method: String,
    /// How the service is deployed, e.g. `stack` or `lambda`.
    #[serde(default)]
    pub deploy_method: String,
    #[serde(default)]
    pub regions: Vec<String>,
    /// Name of the per-service properties table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties_table: Option<String>,
    /// Container repository holding the service's images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl ServiceRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            build_method: "docker".to_string(),
            deploy_method: "stack".to_string(),
            regions: Vec::new(),
            properties_table: None,
            repository: None,
            owner: None,
        }
    }

    /// Repository to list image tags from; defaults to the service name.
    pub fn image_repository(&self) -> &str {
        self.repository.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    Succeeded,
    Failed,
}

/// One deployment, appended when a deploy long task finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRecord {
    pub service: String,
    pub env: String,
    pub region: String,
    pub version: String,
    pub stack_name: String,
    pub deployed_by: String,
    pub deployed_at: DateTime<Utc>,
    pub status: DeployStatus,
}

impl DeployRecord {
    fn key(&self) -> String {
        format!(
            "{}/{}/{}",
            self.service,
            self.env,
            self.deployed_at.timestamp_millis()
        )
    }
}

/// Typed view over a [`TableStore`].
pub struct Catalog<'a> {
    store: &'a dyn TableStore,
}

impl<'a> Catalog<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    // -- services -----------------------------------------------------------

    pub fn service(&self, name: &str) -> Result<ServiceRecord> {
        let value = self
            .store
            .get(SERVICES, name)?
            .ok_or_else(|| BudError::ServiceNotFound(name.to_string()))?;
        decode(SERVICES, name, value)
    }

    pub fn services(&self) -> Result<Vec<ServiceRecord>> {
        self.store
            .scan(SERVICES)?
            .into_iter()
            .map(|(k, v)| decode(SERVICES, &k, v))
            .collect()
    }

    pub fn put_service(&self, record: &ServiceRecord) -> Result<()> {
        self.store
            .put(SERVICES, &record.name, &serde_json::to_value(record)?)
    }

    // -- roles --------------------------------------------------------------

    pub fn role_of(&self, user_id: &str) -> Result<Option<Role>> {
        match self.store.get(ROLES, user_id)? {
            Some(v) => decode(ROLES, user_id, v).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_role(&self, user_id: &str, role: Role) -> Result<()> {
        self.store
            .put(ROLES, user_id, &serde_json::to_value(role)?)
    }

    // -- deploys ------------------------------------------------------------

    pub fn record_deploy(&self, record: &DeployRecord) -> Result<()> {
        self.store
            .put(DEPLOYS, &record.key(), &serde_json::to_value(record)?)
    }

    /// Deploys of `service` to `env`, newest first.
    pub fn deploys(&self, service: &str, env: &str) -> Result<Vec<DeployRecord>> {
        let prefix = format!("{service}/{env}/");
        let mut list: Vec<DeployRecord> = self
            .store
            .scan(DEPLOYS)?
            .into_iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| decode(DEPLOYS, &k, v))
            .collect::<Result<_>>()?;
        list.sort_by(|a, b| b.deployed_at.cmp(&a.deployed_at));
        Ok(list)
    }

    pub fn last_deploy(&self, service: &str, env: &str) -> Result<Option<DeployRecord>> {
        Ok(self.deploys(service, env)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTableStore;
    use chrono::TimeZone;

    #[test]
    fn service_roundtrip_and_missing() {
        let store = MemoryTableStore::new();
        let catalog = Catalog::new(&store);
        let mut api = ServiceRecord::new("api");
        api.regions = vec!["us-east-1".into()];
        catalog.put_service(&api).unwrap();

        assert_eq!(catalog.service("api").unwrap(), api);
        assert!(matches!(
            catalog.service("web"),
            Err(BudError::ServiceNotFound(_))
        ));
        assert_eq!(catalog.services().unwrap().len(), 1);
    }

    #[test]
    fn malformed_rows_are_store_errors() {
        let store = MemoryTableStore::new();
        store
            .put(SERVICES, "bad", &serde_json::json!({"regions": 7}))
            .unwrap();
        let err = Catalog::new(&store).service("bad").unwrap_err();
        assert!(matches!(err, BudError::Store(_)));
        assert!(!err.is_user_facing());
    }

    #[test]
    fn roles_default_to_none() {
        let store = MemoryTableStore::new();
        let catalog = Catalog::new(&store);
        assert_eq!(catalog.role_of("U1").unwrap(), None);
        catalog.set_role("U1", Role::Admin).unwrap();
        assert_eq!(catalog.role_of("U1").unwrap(), Some(Role::Admin));
    }

    #[test]
    fn deploys_are_scoped_and_newest_first() {
        let store = MemoryTableStore::new();
        let catalog = Catalog::new(&store);
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        for (i, env) in ["dev", "dev", "prod"].iter().enumerate() {
            catalog
                .record_deploy(&DeployRecord {
                    service: "api".into(),
                    env: env.to_string(),
                    region: "us-east-1".into(),
                    version: format!("1.0.{i}"),
                    stack_name: format!("api-{env}"),
                    deployed_by: "U1".into(),
                    deployed_at: base + chrono::Duration::hours(i as i64),
                    status: DeployStatus::Succeeded,
                })
                .unwrap();
        }
        let dev = catalog.deploys("api", "dev").unwrap();
        assert_eq!(dev.len(), 2);
        assert_eq!(dev[0].version, "1.0.1");
        assert_eq!(
            catalog.last_deploy("api", "prod").unwrap().unwrap().version,
            "1.0.2"
        );
        assert!(catalog.last_deploy("web", "dev").unwrap().is_none());
    }
}
