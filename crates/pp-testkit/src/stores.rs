//! Stores that wrap the in-memory ones and reject chosen operations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;

use pp_schemas::{Collection, InitState};
use pp_store::{
    DocumentStore, MemoryDocumentStore, MemoryHandle, MemoryRealtimeStore, RealtimeStore,
    StoreError,
};

/// Failure plan shared by both flaky stores.
#[derive(Clone, Debug, Default)]
struct Faults {
    init: Option<String>,
    /// `(collection, key)` pairs whose writes are rejected.
    keys: BTreeSet<(Collection, String)>,
}

impl Faults {
    fn check(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        if self.keys.contains(&(collection, key.to_string())) {
            return Err(StoreError::Query(format!(
                "write rejected for {collection}/{key}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FlakyDocumentStore {
    inner: MemoryDocumentStore,
    state: InitState,
    faults: Faults,
}

impl FlakyDocumentStore {
    pub fn new(inner: MemoryDocumentStore) -> Self {
        Self {
            inner,
            state: InitState::Uninitialized,
            faults: Faults::default(),
        }
    }

    pub fn failing_init(mut self, message: impl Into<String>) -> Self {
        self.faults.init = Some(message.into());
        self
    }

    /// Reject every write (put or delete) to `collection/key`.
    pub fn failing_key(mut self, collection: Collection, key: impl Into<String>) -> Self {
        self.faults.keys.insert((collection, key.into()));
        self
    }

    pub fn handle(&self) -> MemoryHandle {
        self.inner.handle()
    }
}

#[async_trait]
impl DocumentStore for FlakyDocumentStore {
    fn name(&self) -> &'static str {
        "flaky-document"
    }

    fn state(&self) -> &InitState {
        &self.state
    }

    async fn init(&mut self) -> Result<(), StoreError> {
        if let Some(msg) = &self.faults.init {
            self.state = InitState::Failed(msg.clone());
            return Err(StoreError::Connect(msg.clone()));
        }
        self.inner.init().await?;
        self.state = InitState::Ready;
        Ok(())
    }

    fn snapshot(&self, collection: Collection) -> Vec<Value> {
        self.inner.snapshot(collection)
    }

    async fn put_document(
        &self,
        collection: Collection,
        key: &str,
        doc: &Value,
    ) -> Result<(), StoreError> {
        self.faults.check(collection, key)?;
        self.inner.put_document(collection, key, doc).await
    }

    async fn delete_document(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        self.faults.check(collection, key)?;
        self.inner.delete_document(collection, key).await
    }
}

#[derive(Debug, Default)]
pub struct FlakyRealtimeStore {
    inner: MemoryRealtimeStore,
    state: InitState,
    faults: Faults,
}

impl FlakyRealtimeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_init(mut self, message: impl Into<String>) -> Self {
        self.faults.init = Some(message.into());
        self
    }

    pub fn failing_key(mut self, collection: Collection, key: impl Into<String>) -> Self {
        self.faults.keys.insert((collection, key.into()));
        self
    }

    pub fn handle(&self) -> MemoryHandle {
        self.inner.handle()
    }
}

#[async_trait]
impl RealtimeStore for FlakyRealtimeStore {
    fn name(&self) -> &'static str {
        "flaky-realtime"
    }

    fn state(&self) -> &InitState {
        &self.state
    }

    async fn init(&mut self) -> Result<(), StoreError> {
        if let Some(msg) = &self.faults.init {
            self.state = InitState::Failed(msg.clone());
            return Err(StoreError::Connect(msg.clone()));
        }
        self.inner.init().await?;
        self.state = InitState::Ready;
        Ok(())
    }

    async fn put_document(
        &self,
        collection: Collection,
        key: &str,
        doc: &Value,
    ) -> Result<(), StoreError> {
        self.faults.check(collection, key)?;
        self.inner.put_document(collection, key, doc).await
    }
}
