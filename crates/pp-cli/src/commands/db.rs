//! `pp db status` and `pp db migrate`.

use anyhow::{Context, Result};
use pp_config::{resolve_secrets, ConfigScope};
use pp_store::postgres::{self, PgPool};

use super::load_config;

/// Pool for the database named by the layered config's `url_env`, or by
/// `PP_DATABASE_URL` when no config is given.
async fn connect(config_paths: &[String]) -> Result<PgPool> {
    if config_paths.is_empty() {
        return postgres::connect_from_env().await;
    }
    let loaded = load_config(config_paths)?;
    let secrets = resolve_secrets(&loaded.config_json, ConfigScope::Database)?;
    let url = secrets
        .database_url
        .context("SECRETS_MISSING scope=DATABASE: database url")?;
    postgres::connect(&url).await
}

pub async fn status(config_paths: &[String]) -> Result<u8> {
    let pool = connect(config_paths).await?;
    let s = postgres::status(&pool).await?;
    println!("db_ok={} has_documents_table={}", s.ok, s.has_documents_table);
    for (collection, n) in &s.counts {
        println!("collection={} documents={}", collection, n);
    }
    Ok(0)
}

pub async fn migrate(config_paths: &[String]) -> Result<u8> {
    let pool = connect(config_paths).await?;
    postgres::migrate(&pool).await?;
    println!("migrations_applied=true");
    Ok(0)
}
