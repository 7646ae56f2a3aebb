//! Build and test history: the search/indexing collaborator.
//!
//! CI posts one [`BuildRecord`] per build and one [`TestRun`] per test stage.
//! Records are kept in the table store; full-text search builds an
//! ephemeral in-RAM tantivy index over them per query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tantivy::{
    collector::TopDocs,
    query::QueryParser,
    schema::{Field, Schema, Value, STORED, STRING, TEXT},
    Index, IndexWriter, ReloadPolicy, TantivyDocument,
};

use crate::error::{BudError, Result};
use crate::store::{decode, TableStore};

pub const BUILDS: &str = "builds";
pub const TEST_RUNS: &str = "test_runs";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Running,
    Succeeded,
    Failed,
}

impl BuildStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildStatus::Running => "running",
            BuildStatus::Succeeded => "succeeded",
            BuildStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub service: String,
    pub build_number: u64,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub commit: String,
    /// Image tag or artifact version produced by the build.
    #[serde(default)]
    pub version: String,
    pub status: BuildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    pub service: String,
    pub build_number: u64,
    pub passed: u32,
    pub failed: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl TestRun {
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Zero-padded so that key order equals build order.
fn record_key(service: &str, build: u64) -> String {
    format!("{service}/{build:010}")
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

pub struct HistoryStore<'a> {
    store: &'a dyn TableStore,
}

impl<'a> HistoryStore<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    pub fn record_build(&self, build: &BuildRecord) -> Result<()> {
        self.store.put(
            BUILDS,
            &record_key(&build.service, build.build_number),
            &serde_json::to_value(build)?,
        )
    }

    pub fn record_test_run(&self, run: &TestRun) -> Result<()> {
        self.store.put(
            TEST_RUNS,
            &record_key(&run.service, run.build_number),
            &serde_json::to_value(run)?,
        )
    }

    pub fn builds(&self) -> Result<Vec<BuildRecord>> {
        self.store
            .scan(BUILDS)?
            .into_iter()
            .map(|(k, v)| decode(BUILDS, &k, v))
            .collect()
    }

    pub fn find_build(&self, service: &str, build: u64) -> Result<Option<BuildRecord>> {
        let key = record_key(service, build);
        match self.store.get(BUILDS, &key)? {
            Some(v) => decode(BUILDS, &key, v).map(Some),
            None => Ok(None),
        }
    }

    pub fn find_test_run(&self, service: &str, build: u64) -> Result<Option<TestRun>> {
        let key = record_key(service, build);
        match self.store.get(TEST_RUNS, &key)? {
            Some(v) => decode(TEST_RUNS, &key, v).map(Some),
            None => Ok(None),
        }
    }

    /// Newest `n` builds of `service`, optionally limited to one branch.
    pub fn latest_builds(
        &self,
        service: &str,
        branch: Option<&str>,
        n: usize,
    ) -> Result<Vec<BuildRecord>> {
        let mut builds: Vec<BuildRecord> = self
            .builds()?
            .into_iter()
            .filter(|b| b.service == service)
            .filter(|b| branch.map(|br| b.branch == br).unwrap_or(true))
            .collect();
        builds.sort_by(|a, b| b.build_number.cmp(&a.build_number));
        builds.truncate(n);
        Ok(builds)
    }
}

// ---------------------------------------------------------------------------
// BuildIndex
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BuildSearchResult {
    pub service: String,
    pub build_number: u64,
    pub branch: String,
    pub status: String,
    pub version: String,
    pub score: f32,
}

struct Fields {
    service: Field,
    build_number: Field,
    branch: Field,
    status: Field,
    version: Field,
    body: Field,
}

pub struct BuildIndex {
    index: Index,
    reader: tantivy::IndexReader,
    fields: Fields,
}

impl BuildIndex {
    /// Build an ephemeral in-RAM index over `builds`.
    ///
    /// Indexed fields:
    /// - `service`, `branch`, `status`, `version`: STRING (exact-match, stored)
    /// - `build`: STRING (stored) build number
    /// - `body`: TEXT: service, branch, commit, version and message tokens
    pub fn build(builds: &[BuildRecord]) -> Result<Self> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);

        let mut writer: IndexWriter = index
            .writer(15_000_000)
            .map_err(|e| BudError::Search(e.to_string()))?;

        for b in builds {
            let mut doc = TantivyDocument::default();
            doc.add_text(fields.service, &b.service);
            doc.add_text(fields.build_number, b.build_number.to_string());
            doc.add_text(fields.branch, &b.branch);
            doc.add_text(fields.status, b.status.as_str());
            doc.add_text(fields.version, &b.version);

            let body: Vec<&str> = [
                b.service.as_str(),
                b.branch.as_str(),
                b.commit.as_str(),
                b.version.as_str(),
                b.message.as_deref().unwrap_or(""),
            ]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
            doc.add_text(fields.body, body.join(" "));

            writer
                .add_document(doc)
                .map_err(|e| BudError::Search(e.to_string()))?;
        }

        writer
            .commit()
            .map_err(|e| BudError::Search(e.to_string()))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e: tantivy::TantivyError| BudError::Search(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    /// BM25 full-text search, best match first.
    ///
    /// Bare terms are AND-ed; `service:api`, `branch:main` and
    /// `status:failed` scope to a field. Unparseable queries match nothing.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<BuildSearchResult>> {
        if limit == 0 {
            return Ok(vec![]);
        }
        let searcher = self.reader.searcher();

        let mut parser = QueryParser::for_index(&self.index, vec![self.fields.body]);
        parser.set_conjunction_by_default();

        let query = match parser.parse_query(query_str) {
            Ok(q) => q,
            Err(_) => return Ok(vec![]),
        };

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .map_err(|e| BudError::Search(e.to_string()))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(addr)
                .map_err(|e| BudError::Search(e.to_string()))?;
            let text = |f: Field| {
                doc.get_first(f)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string()
            };
            results.push(BuildSearchResult {
                service: text(self.fields.service),
                build_number: text(self.fields.build_number).parse().unwrap_or(0),
                branch: text(self.fields.branch),
                status: text(self.fields.status),
                version: text(self.fields.version),
                score,
            });
        }
        Ok(results)
    }
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let service = builder.add_text_field("service", STRING | STORED);
    let build_number = builder.add_text_field("build", STRING | STORED);
    let branch = builder.add_text_field("branch", STRING | STORED);
    let status = builder.add_text_field("status", STRING | STORED);
    let version = builder.add_text_field("version", STRING | STORED);
    let body = builder.add_text_field("body", TEXT);
    (
        builder.build(),
        Fields {
            service,
            build_number,
            branch,
            status,
            version,
            body,
        },
    )
}
