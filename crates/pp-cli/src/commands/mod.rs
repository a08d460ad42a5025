//! Command handler modules for the `pp` CLI.
//!
//! Shared utilities used by multiple command paths live here.

pub mod db;
pub mod sync;

use std::fs;

use anyhow::{Context, Result};
use pp_config::{report_unused_keys, ConfigScope, LoadedConfig, UnusedKeyPolicy};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub fn load_config(config_paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    pp_config::load_layered_yaml(&path_refs)
}

/// Report config keys `scope` never reads. `Fail` turns a non-empty report
/// into an error.
pub fn check_unused_keys(
    scope: ConfigScope,
    loaded: &LoadedConfig,
    policy: UnusedKeyPolicy,
) -> Result<()> {
    const SHOWN: usize = 50;
    let report = report_unused_keys(scope, &loaded.config_json, policy)?;
    if report.is_clean() {
        return Ok(());
    }
    eprintln!(
        "WARN: CONFIG_UNUSED_KEYS scope={} count={}",
        report.scope,
        report.unused.len()
    );
    for ptr in report.unused.iter().take(SHOWN) {
        eprintln!("  unused={ptr}");
    }
    if report.unused.len() > SHOWN {
        eprintln!("  ({} not shown)", report.unused.len() - SHOWN);
    }
    Ok(())
}

/// `pp fingerprint <file>`: fingerprint and canonical form of a JSON file.
pub fn fingerprint_file(path: &str) -> Result<u8> {
    let bytes = fs::read(path).with_context(|| format!("read json file failed: {path}"))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    let v: Value = serde_json::from_slice(bytes).context("file must contain valid JSON")?;
    println!("fingerprint={}", pp_reconcile::fingerprint(&v));
    println!("{}", pp_reconcile::canonical_json(&v));
    Ok(0)
}
