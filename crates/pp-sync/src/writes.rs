//! Write intents and their fan-out across the stores.

use std::collections::BTreeSet;

use futures_util::future::join_all;
use serde_json::Value;
use tracing::warn;

use pp_reconcile::price_key;
use pp_schemas::{sanitise_id, Collection, Entity, Price};
use pp_store::{hash_key, price_history_key, DocumentStore, RealtimeStore, StoreError};

use crate::report::{StoreRole, WriteFailure, WriteOperation};

#[derive(Clone, Debug)]
pub(crate) enum Payload<'a> {
    Entity { key: String, doc: Value },
    Price(&'a Price),
    Expire(&'a Price),
    Hash(String),
    Statistics { doc: Value, timestamp: i64 },
}

/// One logical write, applied to every store it concerns.
#[derive(Clone, Debug)]
pub(crate) struct Write<'a> {
    pub collection: Collection,
    pub operation: WriteOperation,
    pub payload: Payload<'a>,
}

impl<'a> Write<'a> {
    pub fn entity<T: Entity>(operation: WriteOperation, record: &T) -> Self {
        Self {
            collection: T::COLLECTION,
            operation,
            payload: Payload::Entity {
                key: record.key(),
                doc: record.to_document(),
            },
        }
    }

    pub fn price(price: &'a Price) -> Self {
        Self {
            collection: Collection::Prices,
            operation: WriteOperation::Update,
            payload: Payload::Price(price),
        }
    }

    pub fn expire(price: &'a Price) -> Self {
        Self {
            collection: Collection::Prices,
            operation: WriteOperation::Expire,
            payload: Payload::Expire(price),
        }
    }

    pub fn hash(collection: Collection, hash: String) -> Self {
        Self {
            collection,
            operation: WriteOperation::Hash,
            payload: Payload::Hash(hash),
        }
    }

    pub fn statistics(doc: Value, timestamp: i64) -> Self {
        Self {
            collection: Collection::Statistics,
            operation: WriteOperation::Statistics,
            payload: Payload::Statistics { doc, timestamp },
        }
    }

    /// Expiry deletes from the document store only; the realtime store is
    /// append-only.
    fn reaches_realtime(&self) -> bool {
        !matches!(self.payload, Payload::Expire(_))
    }

    /// Operation as recorded for `role`. A price update lands in the realtime
    /// store as a history entry.
    fn operation_for(&self, role: StoreRole) -> WriteOperation {
        match (role, &self.payload) {
            (StoreRole::Realtime, Payload::Price(_)) => WriteOperation::History,
            _ => self.operation,
        }
    }

    /// Storage key the write addresses in `role`.
    fn key_for(&self, role: StoreRole) -> String {
        match (&self.payload, role) {
            (Payload::Entity { key, .. }, _) => sanitise_id(key),
            (Payload::Price(p), StoreRole::Realtime) => price_history_key(p),
            (Payload::Price(p), StoreRole::Document) | (Payload::Expire(p), _) => price_key(p),
            (Payload::Hash(_), _) => hash_key(self.collection),
            (Payload::Statistics { timestamp, .. }, _) => timestamp.to_string(),
        }
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Default)]
pub(crate) struct Dispatched {
    pub failures: Vec<WriteFailure>,
    /// Indices of writes rejected by at least one store.
    pub rejected: BTreeSet<usize>,
}

impl Dispatched {
    pub fn landed(&self, idx: usize) -> bool {
        !self.rejected.contains(&idx)
    }
}

/// Borrowed view of the stores a run writes to.
#[derive(Clone, Copy)]
pub(crate) struct Targets<'s> {
    pub document: &'s dyn DocumentStore,
    pub realtime: Option<&'s dyn RealtimeStore>,
}

impl<'s> Targets<'s> {
    /// Dispatch every write to every store it concerns, all at once, and wait
    /// for all of them. Failures are returned, never raised.
    pub async fn dispatch(&self, writes: &[Write<'_>]) -> Dispatched {
        let mut jobs: Vec<(usize, StoreRole, &Write<'_>)> = Vec::new();
        for (idx, w) in writes.iter().enumerate() {
            jobs.push((idx, StoreRole::Document, w));
            if self.realtime.is_some() && w.reaches_realtime() {
                jobs.push((idx, StoreRole::Realtime, w));
            }
        }

        let results = join_all(jobs.iter().map(|(_, role, w)| self.apply(*role, w))).await;

        let mut out = Dispatched::default();
        for ((idx, role, w), result) in jobs.iter().zip(results) {
            let Err(err) = result else {
                continue;
            };
            let failure = WriteFailure {
                collection: w.collection,
                store: *role,
                operation: w.operation_for(*role),
                key: w.key_for(*role),
                message: err.to_string(),
            };
            warn!(
                collection = %failure.collection,
                store = failure.store.as_str(),
                operation = failure.operation.as_str(),
                key = %failure.key,
                error = %failure.message,
                "write failed"
            );
            out.rejected.insert(*idx);
            out.failures.push(failure);
        }
        out
    }

    async fn apply(&self, role: StoreRole, w: &Write<'_>) -> Result<(), StoreError> {
        match role {
            StoreRole::Document => {
                let store = self.document;
                match &w.payload {
                    Payload::Entity { key, doc } => store.write_entity(w.collection, key, doc).await,
                    Payload::Price(p) => store.write_price(p).await,
                    Payload::Expire(p) => store.delete_price(p).await,
                    Payload::Hash(h) => store.write_aggregate_hash(w.collection, h).await,
                    Payload::Statistics { doc, timestamp } => {
                        store.write_statistics(doc, *timestamp).await
                    }
                }
            }
            StoreRole::Realtime => {
                let Some(store) = self.realtime else {
                    return Ok(());
                };
                match &w.payload {
                    Payload::Entity { key, doc } => store.write_entity(w.collection, key, doc).await,
                    Payload::Price(p) => store.append_price_history(p).await,
                    Payload::Expire(_) => Ok(()),
                    Payload::Hash(h) => store.write_aggregate_hash(w.collection, h).await,
                    Payload::Statistics { doc, timestamp } => {
                        store.write_statistics(doc, *timestamp).await
                    }
                }
            }
        }
    }
}
