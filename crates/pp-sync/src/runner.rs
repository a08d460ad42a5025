use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use pp_fuelcheck::Upstream;
use pp_reconcile::{
    annotate_staleness, collection_hash, reconcile, reconcile_prices, PriceDiff, PricePolicy,
};
use pp_schemas::{
    ingest_entities, ingest_prices, Brand, Collection, Entity, Fueltype, Ingested, Price, Station,
};
use pp_stats::compute_statistics;
use pp_store::{DocumentStore, RealtimeStore};

use crate::report::{InitError, RunReport, SyncResult, WriteFailure, WriteOperation};
use crate::writes::{Dispatched, Targets, Write};

/// Owns the collaborators for one run.
///
/// The realtime store is optional; without one, everything is written to the
/// document store only.
pub struct SyncRunner {
    upstream: Box<dyn Upstream>,
    document: Box<dyn DocumentStore>,
    realtime: Option<Box<dyn RealtimeStore>>,
    policy: PricePolicy,
    dry_run: bool,
    now: Option<DateTime<Utc>>,
}

impl SyncRunner {
    pub fn new(upstream: Box<dyn Upstream>, document: Box<dyn DocumentStore>) -> Self {
        Self {
            upstream,
            document,
            realtime: None,
            policy: PricePolicy::default(),
            dry_run: false,
            now: None,
        }
    }

    pub fn with_realtime(mut self, realtime: Box<dyn RealtimeStore>) -> Self {
        self.realtime = Some(realtime);
        self
    }

    pub fn with_policy(mut self, policy: PricePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Compute every diff and the report without issuing writes.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Pin the instant used for price ages and the statistics timestamp.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub async fn run(&mut self) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let now = self.now.unwrap_or(started_at);
        info!(%run_id, dry_run = self.dry_run, "sync run starting");

        let init_errors = self.init_all().await;
        if !init_errors.is_empty() {
            for e in &init_errors {
                warn!(%run_id, collaborator = %e.collaborator, error = %e.message, "init failed");
            }
            warn!(%run_id, failures = init_errors.len(), "sync run aborted before reconciliation");
            return RunReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                dry_run: self.dry_run,
                init_errors,
                results: Vec::new(),
            };
        }

        let results = self.sync_all(now).await;
        for r in &results {
            info!(
                %run_id,
                collection = %r.collection,
                enabled = r.enabled.len(),
                disabled = r.disabled.len(),
                updated = r.updated,
                expired = r.expired,
                write_failures = r.write_failures.len(),
                "collection synced"
            );
        }
        info!(%run_id, "sync run finished");

        RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            dry_run: self.dry_run,
            init_errors: Vec::new(),
            results,
        }
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// Bring every collaborator up concurrently and collect every failure.
    async fn init_all(&mut self) -> Vec<InitError> {
        let upstream = &mut self.upstream;
        let document = &mut self.document;
        let realtime = self.realtime.as_mut();

        let (up, doc, rt) = tokio::join!(
            async { upstream.init().await.map_err(|e| e.to_string()) },
            async { document.init().await.map_err(|e| e.to_string()) },
            async {
                match realtime {
                    Some(r) => r.init().await.map_err(|e| e.to_string()),
                    None => Ok(()),
                }
            },
        );

        let mut errors = Vec::new();
        if let Err(message) = up {
            errors.push(InitError {
                collaborator: self.upstream.name().to_string(),
                message,
            });
        }
        if let Err(message) = doc {
            errors.push(InitError {
                collaborator: self.document.name().to_string(),
                message,
            });
        }
        if let (Err(message), Some(r)) = (rt, self.realtime.as_ref()) {
            errors.push(InitError {
                collaborator: r.name().to_string(),
                message,
            });
        }
        errors
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    async fn sync_all(&self, now: DateTime<Utc>) -> Vec<SyncResult> {
        let stored_brands: Vec<Brand> = self.stored_entities();
        let stored_fueltypes: Vec<Fueltype> = self.stored_entities();
        let stored_stations: Vec<Station> = self.stored_entities();
        let stored_prices = self.stored_prices();

        let upstream_brands = self.upstream.brands();
        let upstream_fueltypes = self.upstream.fueltypes();
        let upstream_stations = self.upstream.stations();
        let mut upstream_prices = self.upstream.prices();
        annotate_staleness(&mut upstream_prices, &self.policy, now);

        let price_diff = reconcile_prices(&upstream_prices, &stored_prices, &self.policy, now);

        let (brands, fueltypes, stations, prices, statistics) = tokio::join!(
            self.sync_entities(&upstream_brands, &stored_brands),
            self.sync_entities(&upstream_fueltypes, &stored_fueltypes),
            self.sync_entities(&upstream_stations, &stored_stations),
            self.sync_prices(&price_diff),
            self.sync_statistics(&price_diff, now),
        );
        vec![brands, fueltypes, stations, prices, statistics]
    }

    fn targets(&self) -> Targets<'_> {
        Targets {
            document: &*self.document,
            realtime: self.realtime.as_deref(),
        }
    }

    async fn dispatch(&self, writes: &[Write<'_>]) -> Dispatched {
        if self.dry_run {
            debug!(writes = writes.len(), "dry run; writes skipped");
            return Dispatched::default();
        }
        self.targets().dispatch(writes).await
    }

    /// Record the collection hash, unless a data write was rejected: the
    /// stores would then hold less than the hash describes, so the previous
    /// hash is left in place for the next run to replace.
    async fn write_hash(&self, collection: Collection, hash: String, result: &mut SyncResult) {
        if !result.write_failures.is_empty() {
            warn!(
                %collection,
                write_failures = result.write_failures.len(),
                "collection hash not written"
            );
            return;
        }
        let dispatched = self.dispatch(&[Write::hash(collection, hash.clone())]).await;
        if dispatched.landed(0) {
            result.hash = Some(hash);
        }
        result.write_failures.extend(dispatched.failures);
    }

    async fn sync_entities<T: Entity>(&self, upstream: &[T], stored: &[T]) -> SyncResult {
        let diff = reconcile(upstream, stored);
        let disables = diff.effective_disables();

        let mut writes: Vec<Write<'_>> = diff
            .to_enable
            .iter()
            .map(|e| Write::entity(WriteOperation::Enable, e))
            .collect();
        writes.extend(disables.iter().map(|d| Write::entity(WriteOperation::Disable, *d)));

        let mut result = SyncResult::new(T::COLLECTION);
        let dispatched = self.dispatch(&writes).await;

        let enables = diff.to_enable.len();
        result.enabled = diff
            .to_enable
            .iter()
            .enumerate()
            .filter(|(idx, _)| dispatched.landed(*idx))
            .map(|(_, e)| e.to_document())
            .collect();
        result.disabled = disables
            .iter()
            .enumerate()
            .filter(|(idx, _)| dispatched.landed(enables + idx))
            .map(|(_, d)| d.to_document())
            .collect();
        result.write_failures = dispatched.failures;

        self.write_hash(T::COLLECTION, diff.aggregate_hash(), &mut result)
            .await;
        result
    }

    async fn sync_prices(&self, diff: &PriceDiff) -> SyncResult {
        let upserts = diff.upserts();
        let mut writes: Vec<Write<'_>> = upserts.iter().map(|p| Write::price(p)).collect();
        writes.extend(diff.to_expire.iter().map(Write::expire));

        let mut result = SyncResult::new(Collection::Prices);
        let dispatched = self.dispatch(&writes).await;

        result.updated = (0..upserts.len()).filter(|i| dispatched.landed(*i)).count();
        result.expired = (upserts.len()..writes.len())
            .filter(|i| dispatched.landed(*i))
            .count();
        result.write_failures = dispatched.failures;

        let current: Vec<_> = diff.current().into_iter().map(Price::to_document).collect();
        self.write_hash(Collection::Prices, collection_hash(&current), &mut result)
            .await;
        result
    }

    /// Statistics over the current price view, stored under the run instant.
    async fn sync_statistics(&self, diff: &PriceDiff, now: DateTime<Utc>) -> SyncResult {
        let current: Vec<Price> = diff.current().into_iter().cloned().collect();
        let stats = compute_statistics(&current, now.timestamp());

        let mut result = SyncResult::new(Collection::Statistics);
        result.excluded = stats.excluded.len();
        for e in &stats.excluded {
            warn!(error = %e, "price excluded from statistics");
        }
        if stats.is_empty() {
            info!("no valid prices; statistics not written");
            return result;
        }

        let dispatched = self
            .dispatch(&[Write::statistics(stats.to_document(), stats.timestamp)])
            .await;
        if dispatched.landed(0) {
            result.updated = stats.buckets.len();
        }
        result.write_failures = dispatched.failures;
        result
    }

    // -----------------------------------------------------------------------
    // Stored snapshots
    // -----------------------------------------------------------------------

    fn stored_entities<T: Entity>(&self) -> Vec<T> {
        let ingested = ingest_entities::<T>(&self.document.snapshot(T::COLLECTION));
        log_ingested(T::COLLECTION, &ingested);
        ingested.records
    }

    fn stored_prices(&self) -> Vec<Price> {
        let ingested = ingest_prices(&self.document.snapshot(Collection::Prices));
        log_ingested(Collection::Prices, &ingested);
        ingested.records
    }
}

fn log_ingested<T>(collection: Collection, ingested: &Ingested<T>) {
    for (idx, reason) in &ingested.rejected {
        warn!(%collection, index = idx, %reason, "stored document rejected");
    }
    debug!(
        %collection,
        active = ingested.records.len(),
        inactive = ingested.inactive,
        rejected = ingested.rejected.len(),
        "stored snapshot ingested"
    );
}
