//! PostgreSQL document store.
//!
//! One table, `documents(collection, key, body jsonb, updated_at)`. Writes are
//! upserts on `(collection, key)`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
pub use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

use pp_schemas::{Collection, InitState};

use crate::{DocumentStore, StoreError};

pub const ENV_DB_URL: &str = "PP_DATABASE_URL";

const SNAPSHOT_COLLECTIONS: [Collection; 4] = [
    Collection::Brands,
    Collection::Fueltypes,
    Collection::Stations,
    Collection::Prices,
];

pub async fn connect(url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")
}

/// Connect using `PP_DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

/// Run embedded migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStatus {
    pub ok: bool,
    pub has_documents_table: bool,
    /// Documents per collection; empty when the table is missing.
    pub counts: BTreeMap<String, i64>,
}

/// Connectivity, schema presence and per-collection document counts.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'documents'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    let mut counts = BTreeMap::new();
    if exists {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "select collection, count(*)::bigint from documents group by collection order by collection",
        )
        .fetch_all(pool)
        .await
        .context("status count query failed")?;
        counts.extend(rows);
    }

    Ok(DbStatus {
        ok: one == 1,
        has_documents_table: exists,
        counts,
    })
}

/// Document store backed by the `documents` table.
pub struct PgDocumentStore {
    url: String,
    pool: Option<PgPool>,
    state: InitState,
    snapshots: BTreeMap<Collection, Vec<Value>>,
}

impl std::fmt::Debug for PgDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDocumentStore")
            .field("url", &"<REDACTED>")
            .field("connected", &self.pool.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl PgDocumentStore {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool: None,
            state: InitState::Uninitialized,
            snapshots: BTreeMap::new(),
        }
    }

    /// Wrap an existing pool. `init` still loads snapshots.
    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            url: String::new(),
            pool: Some(pool),
            state: InitState::Uninitialized,
            snapshots: BTreeMap::new(),
        }
    }

    /// Ready pool, or `None` (logged) when not initialised.
    fn ready_pool(&self, op: &str) -> Option<&PgPool> {
        if !self.state.is_ready() {
            debug!(op, "postgres store not ready");
            return None;
        }
        self.pool.as_ref()
    }

    async fn load(pool: &PgPool, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let rows: Vec<(Value,)> =
            sqlx::query_as("select body from documents where collection = $1 order by key")
                .bind(collection.as_str())
                .fetch_all(pool)
                .await
                .map_err(|e| StoreError::Query(format!("load {collection}: {e}")))?;
        Ok(rows.into_iter().map(|(body,)| body).collect())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn state(&self) -> &InitState {
        &self.state
    }

    async fn init(&mut self) -> Result<(), StoreError> {
        let result = async {
            let pool = match self.pool.take() {
                Some(p) => p,
                None => connect(&self.url)
                    .await
                    .map_err(|e| StoreError::Connect(format!("{e:#}")))?,
            };
            let mut snapshots = BTreeMap::new();
            for c in SNAPSHOT_COLLECTIONS {
                snapshots.insert(c, Self::load(&pool, c).await?);
            }
            Ok::<_, StoreError>((pool, snapshots))
        }
        .await;

        match result {
            Ok((pool, snapshots)) => {
                info!(
                    brands = snapshots.get(&Collection::Brands).map_or(0, Vec::len),
                    fueltypes = snapshots.get(&Collection::Fueltypes).map_or(0, Vec::len),
                    stations = snapshots.get(&Collection::Stations).map_or(0, Vec::len),
                    prices = snapshots.get(&Collection::Prices).map_or(0, Vec::len),
                    "postgres snapshots loaded"
                );
                self.pool = Some(pool);
                self.snapshots = snapshots;
                self.state = InitState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = InitState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn snapshot(&self, collection: Collection) -> Vec<Value> {
        if !self.state.is_ready() {
            debug!(%collection, "postgres store not ready");
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
        let Some(pool) = self.ready_pool("put_document") else {
            return Ok(());
        };
        sqlx::query(
            r#"
            insert into documents (collection, key, body, updated_at)
            values ($1, $2, $3, now())
            on conflict (collection, key)
            do update set body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(collection.as_str())
        .bind(key)
        .bind(doc)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Query(format!("put {collection}/{key}: {e}")))?;
        Ok(())
    }

    async fn delete_document(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let Some(pool) = self.ready_pool("delete_document") else {
            return Ok(());
        };
        sqlx::query("delete from documents where collection = $1 and key = $2")
            .bind(collection.as_str())
            .bind(key)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Query(format!("delete {collection}/{key}: {e}")))?;
        Ok(())
    }
}
