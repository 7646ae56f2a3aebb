//! Bulk-loading catalog and history rows.
//!
//! `bud seed <file.yaml>` reads a [`SeedData`] document; `bud seed` without a
//! file loads [`SeedData::demo`] so every command has something to show.
//! Rows are keyed deterministically, so applying the same data twice only
//! overwrites.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::dispatch::Bot;
use crate::error::Result;
use crate::history::{BuildRecord, BuildStatus, TestRun};
use crate::paths;
use crate::storage::ImageTag;
use crate::store::{env_table, ServiceRecord};
use crate::types::Role;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub services: Vec<ServiceRecord>,
    /// User id → role.
    #[serde(default)]
    pub roles: BTreeMap<String, Role>,
    /// Repository → tags.
    #[serde(default)]
    pub images: BTreeMap<String, Vec<ImageTag>>,
    #[serde(default)]
    pub builds: Vec<BuildRecord>,
    #[serde(default)]
    pub test_runs: Vec<TestRun>,
    /// `(service, version)` pairs; each gets a small placeholder artifact.
    #[serde(default)]
    pub artifacts: Vec<(String, String)>,
    /// `env` → table name → row count of placeholder rows.
    #[serde(default)]
    pub tables: BTreeMap<String, BTreeMap<String, usize>>,
}

#[derive(Debug, Default, Serialize)]
pub struct SeedSummary {
    pub services: usize,
    pub roles: usize,
    pub images: usize,
    pub builds: usize,
    pub test_runs: usize,
    pub artifacts: usize,
    pub tables: usize,
}

impl SeedData {
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// A small, consistent data set anchored at `now`.
    pub fn demo(now: DateTime<Utc>) -> Self {
        let mut api = ServiceRecord::new("api");
        api.owner = Some("platform".to_string());
        api.properties_table = Some("api-properties".to_string());
        let mut web = ServiceRecord::new("web");
        web.regions = vec!["us-east-1".to_string()];
        web.repository = Some("frontend/web".to_string());
        let mut worker = ServiceRecord::new("worker");
        worker.build_method = "zip".to_string();
        worker.deploy_method = "lambda".to_string();

        let images = [&api, &web, &worker]
            .iter()
            .map(|s| {
                let tags = (0..4i64)
                    .map(|minor| ImageTag {
                        tag: format!("1.0.{minor}"),
                        pushed_at: now - Duration::days(4 - minor),
                    })
                    .collect();
                (s.image_repository().to_string(), tags)
            })
            .collect();

        let builds = [
            ("api", 1, "main", "1.0.1", BuildStatus::Succeeded, "initial import"),
            ("api", 2, "main", "1.0.2", BuildStatus::Succeeded, "add health endpoint"),
            ("api", 3, "main", "1.0.3", BuildStatus::Succeeded, "bump dependencies"),
            ("api", 4, "feature/retry", "1.0.4-rc", BuildStatus::Failed, "flaky retry test"),
            ("web", 10, "main", "1.0.3", BuildStatus::Succeeded, "new landing page"),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (service, number, branch, version, status, message))| {
            let started_at = now - Duration::hours(10 - i as i64);
            BuildRecord {
                service: service.to_string(),
                build_number: number,
                branch: branch.to_string(),
                commit: format!("{:07x}", 0xabc_0000 + number),
                version: version.to_string(),
                status,
                message: Some(message.to_string()),
                started_at,
                finished_at: Some(started_at + Duration::minutes(7)),
            }
        })
        .collect();

        let test_runs = vec![
            TestRun {
                service: "api".to_string(),
                build_number: 3,
                passed: 128,
                failed: 0,
                skipped: 2,
                report_url: Some("https://ci.example/api/3/report".to_string()),
                finished_at: now - Duration::hours(7),
            },
            TestRun {
                service: "api".to_string(),
                build_number: 4,
                passed: 120,
                failed: 3,
                skipped: 0,
                report_url: None,
                finished_at: now - Duration::hours(6),
            },
        ];

        let mut tables: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        tables.entry("dev".into()).or_default().insert("Orders".into(), 3);
        tables.entry("dev".into()).or_default().insert("Users".into(), 2);
        tables.entry("prod".into()).or_default().insert("Orders".into(), 5);

        Self {
            services: vec![api, web, worker],
            roles: BTreeMap::new(),
            images,
            builds,
            test_runs,
            artifacts: vec![
                ("worker".to_string(), "1.0.2".to_string()),
                ("worker".to_string(), "1.0.3".to_string()),
            ],
            tables,
        }
    }

    pub fn apply(&self, bot: &Bot) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        let catalog = bot.catalog();
        for service in &self.services {
            catalog.put_service(service)?;
            summary.services += 1;
        }
        for (user, role) in &self.roles {
            catalog.set_role(user, *role)?;
            summary.roles += 1;
        }
        for (repo, tags) in &self.images {
            for tag in tags {
                bot.registry.push(repo, tag.clone())?;
                summary.images += 1;
            }
        }

        let history = bot.history();
        for build in &self.builds {
            history.record_build(build)?;
            summary.builds += 1;
        }
        for run in &self.test_runs {
            history.record_test_run(run)?;
            summary.test_runs += 1;
        }

        for (service, version) in &self.artifacts {
            bot.objects.put(
                &paths::artifact_key(service, version),
                format!("{service} {version}").as_bytes(),
            )?;
            summary.artifacts += 1;
        }

        for (env, tables) in &self.tables {
            for (table, rows) in tables {
                let name = env_table(env, table);
                for i in 0..*rows {
                    bot.tables.put(
                        &name,
                        &format!("{i:04}"),
                        &serde_json::json!({ "id": i, "table": table }),
                    )?;
                }
                summary.tables += 1;
            }
        }

        tracing::info!(?summary, "seed data applied");
        Ok(summary)
    }
}
