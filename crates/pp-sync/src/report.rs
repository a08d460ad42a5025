use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use pp_schemas::Collection;

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// A collaborator that could not be brought up. Fatal for the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InitError {
    pub collaborator: String,
    pub message: String,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed to initialize: {}", self.collaborator, self.message)
    }
}

impl std::error::Error for InitError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreRole {
    Document,
    Realtime,
}

impl StoreRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreRole::Document => "document",
            StoreRole::Realtime => "realtime",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOperation {
    Enable,
    Disable,
    Update,
    Expire,
    History,
    Hash,
    Statistics,
}

impl WriteOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOperation::Enable => "enable",
            WriteOperation::Disable => "disable",
            WriteOperation::Update => "update",
            WriteOperation::Expire => "expire",
            WriteOperation::History => "history",
            WriteOperation::Hash => "hash",
            WriteOperation::Statistics => "statistics",
        }
    }
}

/// One write that a store rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub collection: Collection,
    pub store: StoreRole,
    pub operation: WriteOperation,
    pub key: String,
    pub message: String,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}/{}: {}",
            self.store.as_str(),
            self.operation.as_str(),
            self.collection,
            self.key,
            self.message
        )
    }
}

// ---------------------------------------------------------------------------
// Per-collection result
// ---------------------------------------------------------------------------

/// Effective diff applied to one collection.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncResult {
    pub collection: Collection,
    /// Documents written active. Writes any store rejected are left out and
    /// appear in `write_failures` instead.
    pub enabled: Vec<Value>,
    /// Documents written back with `active = false`.
    pub disabled: Vec<Value>,
    /// Prices upserted, or statistics buckets written.
    pub updated: usize,
    /// Prices deleted from the document store.
    pub expired: usize,
    /// Prices left out of the statistics pass.
    pub excluded: usize,
    /// Aggregate hash recorded for the collection. `None` when no hash was
    /// written because a write of the collection was rejected.
    pub hash: Option<String>,
    pub write_failures: Vec<WriteFailure>,
}

impl SyncResult {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            enabled: Vec::new(),
            disabled: Vec::new(),
            updated: 0,
            expired: 0,
            excluded: 0,
            hash: None,
            write_failures: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.enabled.is_empty() && self.disabled.is_empty() && self.updated == 0 && self.expired == 0
    }

    pub fn summary(&self) -> CollectionSummary {
        CollectionSummary {
            collection: self.collection,
            enabled: self.enabled.len(),
            disabled: self.disabled.len(),
            updated: self.updated,
            expired: self.expired,
            excluded: self.excluded,
            hash: self.hash.clone(),
            write_failures: self.write_failures.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    InitFailed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::InitFailed => "init_failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub init_errors: Vec<InitError>,
    /// One entry per synced collection, in `Collection::SYNCED` order. Empty
    /// when initialization failed.
    pub results: Vec<SyncResult>,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        if self.init_errors.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::InitFailed
        }
    }

    pub fn result(&self, collection: Collection) -> Option<&SyncResult> {
        self.results.iter().find(|r| r.collection == collection)
    }

    pub fn write_failures(&self) -> impl Iterator<Item = &WriteFailure> {
        self.results.iter().flat_map(|r| r.write_failures.iter())
    }

    /// Process exit status: 2 when initialization failed; 1 when
    /// `strict_writes` is set and any write failed; 0 otherwise.
    pub fn exit_code(&self, strict_writes: bool) -> u8 {
        if self.status() == RunStatus::InitFailed {
            2
        } else if strict_writes && self.write_failures().next().is_some() {
            1
        } else {
            0
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            status: self.status(),
            dry_run: self.dry_run,
            started_at: self.started_at,
            finished_at: self.finished_at,
            init_errors: self.init_errors.clone(),
            collections: self.results.iter().map(SyncResult::summary).collect(),
        }
    }
}

/// Counts-only view of a [`SyncResult`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub collection: Collection,
    pub enabled: usize,
    pub disabled: usize,
    pub updated: usize,
    pub expired: usize,
    pub excluded: usize,
    pub hash: Option<String>,
    pub write_failures: Vec<WriteFailure>,
}

/// Printable run summary (`Display` for text, `Serialize` for `--json`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub init_errors: Vec<InitError>,
    pub collections: Vec<CollectionSummary>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run_id={} status={} dry_run={}",
            self.run_id,
            self.status.as_str(),
            self.dry_run
        )?;
        for e in &self.init_errors {
            writeln!(f, "init_error collaborator={} message={}", e.collaborator, e.message)?;
        }
        for c in &self.collections {
            writeln!(
                f,
                "{} enabled={} disabled={} updated={} expired={} excluded={} write_failures={} hash={}",
                c.collection,
                c.enabled,
                c.disabled,
                c.updated,
                c.expired,
                c.excluded,
                c.write_failures.len(),
                c.hash.as_deref().unwrap_or("-")
            )?;
            for w in &c.write_failures {
                writeln!(f, "  write_failure {w}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(init_errors: Vec<InitError>, results: Vec<SyncResult>) -> RunReport {
        let t = Utc::now();
        RunReport {
            run_id: Uuid::nil(),
            started_at: t,
            finished_at: t,
            dry_run: false,
            init_errors,
            results,
        }
    }

    fn failure() -> WriteFailure {
        WriteFailure {
            collection: Collection::Brands,
            store: StoreRole::Document,
            operation: WriteOperation::Enable,
            key: "Shell".into(),
            message: "boom".into(),
        }
    }

    #[test]
    fn exit_codes() {
        let init = report(
            vec![InitError {
                collaborator: "fuelcheck".into(),
                message: "401".into(),
            }],
            vec![],
        );
        assert_eq!(init.exit_code(false), 2);
        assert_eq!(init.status(), RunStatus::InitFailed);

        let mut brands = SyncResult::new(Collection::Brands);
        brands.write_failures.push(failure());
        let partial = report(vec![], vec![brands]);
        assert_eq!(partial.exit_code(false), 0);
        assert_eq!(partial.exit_code(true), 1);

        assert_eq!(report(vec![], vec![]).exit_code(true), 0);
    }

    #[test]
    fn summary_counts_and_text() {
        let mut brands = SyncResult::new(Collection::Brands);
        brands.enabled.push(json!({"name": "Shell", "active": true, "order": 0}));
        brands.disabled.push(json!({"name": "Caltex", "active": false, "order": 1}));
        brands.hash = Some("abc".into());
        brands.write_failures.push(failure());

        let summary = report(vec![], vec![brands]).summary();
        let c = &summary.collections[0];
        assert_eq!((c.enabled, c.disabled), (1, 1));

        let text = summary.to_string();
        assert!(text.contains("status=completed"));
        assert!(text.contains("brands enabled=1 disabled=1 updated=0 expired=0 excluded=0 write_failures=1 hash=abc"));
        assert!(text.contains("write_failure document enable brands/Shell: boom"));

        let js = serde_json::to_value(&summary).unwrap();
        assert_eq!(js["status"], "completed");
        assert_eq!(js["collections"][0]["collection"], "brands");
        assert_eq!(js["collections"][0]["write_failures"][0]["operation"], "enable");
    }
}
