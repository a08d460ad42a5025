//! pp-store
//!
//! Downstream stores. Two roles:
//!
//! - [`DocumentStore`]: the primary store. Holds the authoritative snapshot of
//!   every collection and is the only store prices are ever deleted from.
//! - [`RealtimeStore`]: the secondary store clients subscribe to. Append-only
//!   for price history; it has no delete operation.
//!
//! Both are gated by [`InitState`]: before a successful `init`, snapshots are
//! empty and writes are logged no-ops.

use std::fmt;

use async_trait::async_trait;
use serde_json::{json, Value};

use pp_reconcile::price_key;
use pp_schemas::{sanitise_id, Collection, InitState, Price};

pub mod memory;
pub mod postgres;
pub mod realtime;

pub use memory::{MemoryDocumentStore, MemoryHandle, MemoryRealtimeStore, WriteOp};
pub use postgres::PgDocumentStore;
pub use realtime::RestRealtimeStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Could not reach or authenticate against the store.
    Connect(String),
    /// A read or write was rejected.
    Query(String),
    /// HTTP store answered with a non-success status.
    Http { status: u16, message: String },
    Transport(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connect(msg) => write!(f, "store connect error: {msg}"),
            StoreError::Query(msg) => write!(f, "store query error: {msg}"),
            StoreError::Http { status, message } => {
                write!(f, "store http error status={status}: {message}")
            }
            StoreError::Transport(msg) => write!(f, "store transport error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Key of the hash document for `collection` inside [`Collection::Hash`].
pub fn hash_key(collection: Collection) -> String {
    collection.as_str().to_string()
}

/// Key of a price-history entry: price key and update time.
pub fn price_history_key(price: &Price) -> String {
    format!("{}/{}", price_key(price), price.time)
}

/// Primary document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &'static str;

    fn state(&self) -> &InitState;

    /// Connect and load the snapshot of every synced collection.
    async fn init(&mut self) -> Result<(), StoreError>;

    /// Raw documents of `collection` as loaded by `init`.
    fn snapshot(&self, collection: Collection) -> Vec<Value>;

    async fn put_document(
        &self,
        collection: Collection,
        key: &str,
        doc: &Value,
    ) -> Result<(), StoreError>;

    async fn delete_document(&self, collection: Collection, key: &str) -> Result<(), StoreError>;

    /// Upsert an entity document under its sanitised natural key.
    async fn write_entity(
        &self,
        collection: Collection,
        key: &str,
        doc: &Value,
    ) -> Result<(), StoreError> {
        self.put_document(collection, &sanitise_id(key), doc).await
    }

    /// Overwrite the current price for `(id, fueltype)`.
    async fn write_price(&self, price: &Price) -> Result<(), StoreError> {
        self.put_document(Collection::Prices, &price_key(price), &price.to_document())
            .await
    }

    async fn delete_price(&self, price: &Price) -> Result<(), StoreError> {
        self.delete_document(Collection::Prices, &price_key(price))
            .await
    }

    async fn write_aggregate_hash(
        &self,
        collection: Collection,
        hash: &str,
    ) -> Result<(), StoreError> {
        self.put_document(Collection::Hash, &hash_key(collection), &json!({ "hash": hash }))
            .await
    }

    async fn write_statistics(&self, doc: &Value, timestamp: i64) -> Result<(), StoreError> {
        self.put_document(Collection::Statistics, &timestamp.to_string(), doc)
            .await
    }
}

/// Secondary realtime store. Never deleted from.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    fn name(&self) -> &'static str;

    fn state(&self) -> &InitState;

    async fn init(&mut self) -> Result<(), StoreError>;

    async fn put_document(
        &self,
        collection: Collection,
        key: &str,
        doc: &Value,
    ) -> Result<(), StoreError>;

    async fn write_entity(
        &self,
        collection: Collection,
        key: &str,
        doc: &Value,
    ) -> Result<(), StoreError> {
        self.put_document(collection, &sanitise_id(key), doc).await
    }

    /// Record a price observation. Entries accumulate; old ones stay.
    async fn append_price_history(&self, price: &Price) -> Result<(), StoreError> {
        self.put_document(Collection::Prices, &price_history_key(price), &price.to_document())
            .await
    }

    async fn write_aggregate_hash(
        &self,
        collection: Collection,
        hash: &str,
    ) -> Result<(), StoreError> {
        self.put_document(Collection::Hash, &hash_key(collection), &json!({ "hash": hash }))
            .await
    }

    async fn write_statistics(&self, doc: &Value, timestamp: i64) -> Result<(), StoreError> {
        self.put_document(Collection::Statistics, &timestamp.to_string(), doc)
            .await
    }
}
