//! In-process stores. Used for `kind: memory` runs and throughout the tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use pp_reconcile::price_key;
use pp_schemas::{sanitise_id, Collection, Entity, InitState, Price};

use crate::{DocumentStore, RealtimeStore, StoreError};

type Documents = BTreeMap<Collection, BTreeMap<String, Value>>;

/// One write as seen by a store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Put { collection: Collection, key: String },
    Delete { collection: Collection, key: String },
}

const SNAPSHOT_COLLECTIONS: [Collection; 4] = [
    Collection::Brands,
    Collection::Fueltypes,
    Collection::Stations,
    Collection::Prices,
];

/// Shared contents of an in-process store. Outlives the store itself, so a
/// test can keep a [`MemoryHandle`] after boxing the store into a runner.
#[derive(Debug, Default)]
struct Shared {
    docs: RwLock<Documents>,
    log: RwLock<Vec<WriteOp>>,
}

impl Shared {
    async fn put(&self, collection: Collection, key: &str, doc: &Value) {
        self.docs
            .write()
            .await
            .entry(collection)
            .or_default()
            .insert(key.to_string(), doc.clone());
        self.log.write().await.push(WriteOp::Put {
            collection,
            key: key.to_string(),
        });
    }
}

/// Read-only view of a memory store's contents.
#[derive(Clone, Debug)]
pub struct MemoryHandle {
    shared: Arc<Shared>,
}

impl MemoryHandle {
    /// Current contents of `collection`.
    pub async fn documents(&self, collection: Collection) -> BTreeMap<String, Value> {
        self.shared
            .docs
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Every write applied since construction, in order.
    pub async fn writes(&self) -> Vec<WriteOp> {
        self.shared.log.read().await.clone()
    }
}

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    state: InitState,
    /// Documents staged by the builders; merged into `shared` on `init`.
    seed: Documents,
    shared: Arc<Shared>,
    snapshots: BTreeMap<Collection, Vec<Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with entity documents, keyed the way the sync writes them.
    pub fn with_entities<T: Entity>(mut self, records: &[T]) -> Self {
        let docs = self.seed.entry(T::COLLECTION).or_default();
        for r in records {
            docs.insert(sanitise_id(&r.key()), r.to_document());
        }
        self
    }

    pub fn with_prices(mut self, prices: &[Price]) -> Self {
        let docs = self.seed.entry(Collection::Prices).or_default();
        for p in prices {
            docs.insert(price_key(p), p.to_document());
        }
        self
    }

    /// Pre-populate with a raw document.
    pub fn with_document(mut self, collection: Collection, key: &str, doc: Value) -> Self {
        self.seed
            .entry(collection)
            .or_default()
            .insert(key.to_string(), doc);
        self
    }

    pub fn handle(&self) -> MemoryHandle {
        MemoryHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub async fn documents(&self, collection: Collection) -> BTreeMap<String, Value> {
        self.handle().documents(collection).await
    }

    pub async fn writes(&self) -> Vec<WriteOp> {
        self.handle().writes().await
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &'static str {
        "memory-document"
    }

    fn state(&self) -> &InitState {
        &self.state
    }

    /// Re-reads the snapshot on every call, so a second run against the same
    /// contents sees the first run's writes.
    async fn init(&mut self) -> Result<(), StoreError> {
        let mut docs = self.shared.docs.write().await;
        for (collection, seeded) in std::mem::take(&mut self.seed) {
            docs.entry(collection).or_default().extend(seeded);
        }
        self.snapshots = SNAPSHOT_COLLECTIONS
            .iter()
            .map(|c| {
                let values = docs
                    .get(c)
                    .map(|m| m.values().cloned().collect())
                    .unwrap_or_default();
                (*c, values)
            })
            .collect();
        drop(docs);
        self.state = InitState::Ready;
        Ok(())
    }

    fn snapshot(&self, collection: Collection) -> Vec<Value> {
        if !self.state.is_ready() {
            debug!(%collection, "memory store not ready");
            return Vec::new();
        }
        self.snapshots.get(&collection).cloned().unwrap_or_default()
    }

    async fn put_document(
        &self,
        collection: Collection,
        key: &str,
        doc: &Value,
    ) -> Result<(), StoreError> {
        if !self.state.is_ready() {
            debug!(%collection, key, "memory store not ready; put skipped");
            return Ok(());
        }
        self.shared.put(collection, key, doc).await;
        Ok(())
    }

    async fn delete_document(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        if !self.state.is_ready() {
            debug!(%collection, key, "memory store not ready; delete skipped");
            return Ok(());
        }
        if let Some(m) = self.shared.docs.write().await.get_mut(&collection) {
            m.remove(key);
        }
        self.shared.log.write().await.push(WriteOp::Delete {
            collection,
            key: key.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRealtimeStore {
    state: InitState,
    shared: Arc<Shared>,
}

impl MemoryRealtimeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MemoryHandle {
        MemoryHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub async fn documents(&self, collection: Collection) -> BTreeMap<String, Value> {
        self.handle().documents(collection).await
    }

    pub async fn writes(&self) -> Vec<WriteOp> {
        self.handle().writes().await
    }
}

#[async_trait]
impl RealtimeStore for MemoryRealtimeStore {
    fn name(&self) -> &'static str {
        "memory-realtime"
    }

    fn state(&self) -> &InitState {
        &self.state
    }

    async fn init(&mut self) -> Result<(), StoreError> {
        self.state = InitState::Ready;
        Ok(())
    }

    async fn put_document(
        &self,
        collection: Collection,
        key: &str,
        doc: &Value,
    ) -> Result<(), StoreError> {
        if !self.state.is_ready() {
            debug!(%collection, key, "memory realtime store not ready; put skipped");
            return Ok(());
        }
        self.shared.put(collection, key, doc).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pp_schemas::Brand;

    #[tokio::test]
    async fn writes_before_init_are_noops() {
        let store = MemoryDocumentStore::new();
        store
            .put_document(Collection::Brands, "Shell", &Brand::new("Shell", 0).to_document())
            .await
            .unwrap();
        assert!(store.documents(Collection::Brands).await.is_empty());
        assert!(store.writes().await.is_empty());
        assert!(store.snapshot(Collection::Brands).is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_fixed_at_init() {
        let mut store = MemoryDocumentStore::new().with_entities(&[Brand::new("Shell", 0)]);
        store.init().await.unwrap();

        store
            .write_entity(Collection::Brands, "BP", &Brand::new("BP", 1).to_document())
            .await
            .unwrap();

        assert_eq!(store.snapshot(Collection::Brands).len(), 1);
        assert_eq!(store.documents(Collection::Brands).await.len(), 2);
    }

    #[tokio::test]
    async fn handle_outlives_boxed_store() {
        let mut store = MemoryDocumentStore::new();
        let handle = store.handle();
        store.init().await.unwrap();

        let boxed: Box<dyn DocumentStore> = Box::new(store);
        boxed
            .write_entity(Collection::Brands, "Shell", &Brand::new("Shell", 0).to_document())
            .await
            .unwrap();
        drop(boxed);

        assert_eq!(handle.documents(Collection::Brands).await.len(), 1);
    }

    #[tokio::test]
    async fn reinit_sees_previous_writes() {
        let mut store = MemoryDocumentStore::new();
        store.init().await.unwrap();
        store
            .write_entity(Collection::Brands, "BP", &Brand::new("BP", 1).to_document())
            .await
            .unwrap();

        store.init().await.unwrap();
        assert_eq!(store.snapshot(Collection::Brands).len(), 1);
    }

    #[tokio::test]
    async fn price_delete_uses_price_key() {
        let p = Price::new("1", "E10", 170.0, 100);
        let mut store = MemoryDocumentStore::new().with_prices(&[p.clone()]);
        store.init().await.unwrap();

        store.delete_price(&p).await.unwrap();

        assert!(store.documents(Collection::Prices).await.is_empty());
        assert_eq!(
            store.writes().await,
            vec![WriteOp::Delete {
                collection: Collection::Prices,
                key: price_key(&p)
            }]
        );
    }

    #[tokio::test]
    async fn realtime_history_accumulates() {
        let mut store = MemoryRealtimeStore::new();
        store.init().await.unwrap();

        store
            .append_price_history(&Price::new("1", "E10", 170.0, 100))
            .await
            .unwrap();
        store
            .append_price_history(&Price::new("1", "E10", 168.0, 200))
            .await
            .unwrap();

        assert_eq!(store.documents(Collection::Prices).await.len(), 2);
    }
}
