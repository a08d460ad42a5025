//! `pp sync`: build the collaborators from config and run one sync.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use tracing::info;

use pp_config::{
    resolve_secrets, ConfigScope, DocumentStoreKind, RealtimeStoreKind, ResolvedSecrets,
    SyncSettings, UnusedKeyPolicy,
};
use pp_fuelcheck::{FuelCheckClient, FuelCheckConfig};
use pp_reconcile::PricePolicy;
use pp_store::{
    DocumentStore, MemoryDocumentStore, MemoryRealtimeStore, PgDocumentStore, RealtimeStore,
    RestRealtimeStore,
};
use pp_sync::SyncRunner;

use super::{check_unused_keys, load_config};

pub struct SyncArgs {
    pub config_paths: Vec<String>,
    pub dry_run: bool,
    pub json: bool,
    pub strict_writes: bool,
    pub strict_config: bool,
}

pub async fn run_sync(args: SyncArgs) -> Result<u8> {
    let loaded = load_config(&args.config_paths)?;
    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    check_unused_keys(ConfigScope::Sync, &loaded, policy)?;

    let settings = loaded.settings()?;
    let secrets = resolve_secrets(&loaded.config_json, ConfigScope::Sync)?;
    let dry_run = args.dry_run || settings.sync.dry_run;

    info!(config_hash = %loaded.config_hash, dry_run, "starting sync");
    let mut runner = build_runner(&settings, &secrets)?.dry_run(dry_run);
    let report = runner.run().await;

    let summary = report.summary();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serialize run summary")?
        );
    } else {
        print!("{summary}");
    }
    Ok(report.exit_code(args.strict_writes))
}

/// Wire the upstream client and stores named by `settings`.
pub fn build_runner(settings: &SyncSettings, secrets: &ResolvedSecrets) -> Result<SyncRunner> {
    let policy = PricePolicy::new(
        settings.prices.stale_after_days,
        settings.prices.expire_after_days,
    )
    .context("CONFIG_INVALID: prices")?;

    let fc = &settings.fuelcheck;
    let timezone: Tz = fc
        .timezone
        .parse()
        .map_err(|e| anyhow!("CONFIG_INVALID: fuelcheck.timezone '{}': {}", fc.timezone, e))?;
    let timeout = Duration::from_secs(fc.timeout_secs);

    let upstream = FuelCheckClient::new(FuelCheckConfig {
        base_url: fc.base_url.clone(),
        api_key: secrets
            .fuelcheck_api_key
            .clone()
            .context("SECRETS_MISSING: fuelcheck api key")?,
        api_secret: secrets
            .fuelcheck_api_secret
            .clone()
            .context("SECRETS_MISSING: fuelcheck api secret")?,
        timezone,
        token_cache_path: PathBuf::from(&fc.token_cache_path),
        max_token_attempts: fc.max_token_attempts,
        timeout,
        policy,
    })
    .context("build fuelcheck client")?;

    let document: Box<dyn DocumentStore> = match settings.stores.document.kind {
        DocumentStoreKind::Postgres => Box::new(PgDocumentStore::new(
            secrets
                .database_url
                .clone()
                .context("SECRETS_MISSING: database url")?,
        )),
        DocumentStoreKind::Memory => Box::new(MemoryDocumentStore::new()),
    };

    let realtime_settings = &settings.stores.realtime;
    let realtime: Option<Box<dyn RealtimeStore>> = match realtime_settings.kind {
        RealtimeStoreKind::Rest => Some(Box::new(
            RestRealtimeStore::new(
                realtime_settings.base_url.clone(),
                secrets.realtime_auth.clone(),
                timeout,
            )
            .context("build realtime store")?,
        )),
        RealtimeStoreKind::Memory => Some(Box::new(MemoryRealtimeStore::new())),
        RealtimeStoreKind::None => None,
    };

    let mut runner = SyncRunner::new(Box::new(upstream), document).with_policy(policy);
    if let Some(r) = realtime {
        runner = runner.with_realtime(r);
    }
    Ok(runner)
}
