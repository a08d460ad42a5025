//! DB-backed tests, skipped if PP_DATABASE_URL is not set.

use serde_json::json;

use pp_schemas::{Brand, Collection, Entity, InitState};
use pp_store::postgres::{self, ENV_DB_URL};
use pp_store::{DocumentStore, PgDocumentStore};

async fn pool() -> Option<sqlx::PgPool> {
    let url = match std::env::var(ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: {ENV_DB_URL} not set");
            return None;
        }
    };
    let pool = postgres::connect(&url).await.ok()?;
    postgres::migrate(&pool).await.ok()?;
    Some(pool)
}

#[tokio::test]
async fn migrate_is_idempotent_and_status_sees_table() -> anyhow::Result<()> {
    let Some(pool) = pool().await else {
        return Ok(());
    };
    postgres::migrate(&pool).await?;

    let st = postgres::status(&pool).await?;
    assert!(st.ok);
    assert!(st.has_documents_table);
    Ok(())
}

#[tokio::test]
async fn upsert_snapshot_and_delete() -> anyhow::Result<()> {
    let Some(pool) = pool().await else {
        return Ok(());
    };
    sqlx::query("delete from documents where collection = 'brands' and key like 'pgtest-%'")
        .execute(&pool)
        .await?;

    let mut store = PgDocumentStore::with_pool(pool.clone());
    store.init().await?;
    assert_eq!(store.state(), &InitState::Ready);

    let brand = Brand::new("pgtest-Shell", 0);
    store
        .write_entity(Collection::Brands, &brand.key(), &brand.to_document())
        .await?;
    store
        .write_entity(Collection::Brands, &brand.key(), &brand.deactivated().to_document())
        .await?;

    let (body,): (serde_json::Value,) =
        sqlx::query_as("select body from documents where collection = 'brands' and key = $1")
            .bind("pgtest-Shell")
            .fetch_one(&pool)
            .await?;
    assert_eq!(body, json!({"name": "pgtest-Shell", "active": false, "order": 0}));

    store
        .delete_document(Collection::Brands, "pgtest-Shell")
        .await?;
    let (n,): (i64,) = sqlx::query_as(
        "select count(*)::bigint from documents where collection = 'brands' and key = 'pgtest-Shell'",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(n, 0);
    Ok(())
}
