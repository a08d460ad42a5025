//! pp-config
//!
//! Layered YAML configuration for the sync pipeline.
//!
//! - Layers are merged in order (later overrides earlier), converted to JSON,
//!   canonicalized and hashed so every run can record exactly which
//!   configuration it ran with.
//! - Secrets never live in YAML. Config stores env var NAMES; see [`secrets`].
//! - Leaves that no code path reads are reported per [`ConfigScope`].

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

mod pointer;
pub mod secrets;
pub mod settings;

pub use secrets::{resolve_secrets, ResolvedSecrets};
pub use settings::{
    DocumentStoreKind, DocumentStoreSettings, FuelCheckSettings, PriceSettings, RealtimeStoreKind,
    RealtimeStoreSettings, RunSettings, StoreSettings, SyncSettings,
};

/// Leaf string prefixes that indicate a credential pasted into config.
const SECRET_PREFIXES: &[&str] = &[
    "-----BEGIN", // PEM private keys
    "Basic ",     // pre-encoded basic auth header
    "Bearer ",    // bearer token header
    "postgres://",
    "postgresql://",
    "AIza", // Google / Firebase API key
    "ghp_",
    "sk-",
];

/// Which command is reading the config. Determines the consumed-key registry
/// and which secrets are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    /// Full sync run: upstream, stores and price policy.
    Sync,
    /// Database maintenance (`db migrate`, `db status`).
    Database,
}

impl ConfigScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigScope::Sync => "SYNC",
            ConfigScope::Database => "DATABASE",
        }
    }
}

/// What to do when a config carries leaves its scope never reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub scope: String,
    /// Normalized consumed prefixes, sorted and unique.
    pub consumed: Vec<String>,
    /// Leaf pointers no consumed prefix covers, sorted.
    pub unused: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused.is_empty()
    }
}

/// JSON-pointer prefixes read by each scope. A leaf under a listed prefix is
/// consumed. Keep this in step with `settings` and `secrets`.
pub fn consumed_pointers_for_scope(scope: ConfigScope) -> &'static [&'static str] {
    match scope {
        ConfigScope::Sync => &[
            "/sync/dry_run",
            "/prices/stale_after_days",
            "/prices/expire_after_days",
            "/fuelcheck/base_url",
            "/fuelcheck/timezone",
            "/fuelcheck/token_cache_path",
            "/fuelcheck/max_token_attempts",
            "/fuelcheck/timeout_secs",
            "/fuelcheck/keys_env/api_key",
            "/fuelcheck/keys_env/api_secret",
            "/stores/document",
            "/stores/realtime",
        ],
        ConfigScope::Database => &["/stores/document"],
    }
}

/// Compare the leaves of `config_json` against what `scope` reads.
/// Under [`UnusedKeyPolicy::Fail`] any unused leaf is an error.
pub fn report_unused_keys(
    scope: ConfigScope,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed: Vec<String> = consumed_pointers_for_scope(scope)
        .iter()
        .map(|p| pointer::normalize(p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let unused: Vec<String> = pointer::leaves(config_json)
        .into_iter()
        .map(|(ptr, _)| ptr)
        .filter(|ptr| !consumed.iter().any(|c| pointer::covers(c, ptr)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if policy == UnusedKeyPolicy::Fail && !unused.is_empty() {
        let first: Vec<&String> = unused.iter().take(12).collect();
        bail!(
            "CONFIG_UNUSED_KEYS (scope={}): {} leaf key(s) not read by this command, first: {:?}",
            scope.as_str(),
            unused.len(),
            first
        );
    }

    Ok(UnusedKeyReport {
        scope: scope.as_str().to_string(),
        consumed,
        unused,
    })
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view of the merged config. Missing sections take defaults.
    pub fn settings(&self) -> Result<SyncSettings> {
        SyncSettings::from_config_json(&self.config_json)
    }
}

/// Read and merge YAML layers from disk, in order.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let layers = paths
        .iter()
        .map(|path| fs::read_to_string(path).with_context(|| format!("read config layer {path}")))
        .collect::<Result<Vec<String>>>()?;
    let layer_refs: Vec<&str> = layers.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&layer_refs)
}

/// Merge in-memory YAML layers, reject pasted secrets and hash the result.
pub fn load_layered_yaml_from_strings(layers: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (idx, raw) in layers.iter().enumerate() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("config layer {idx} is not valid yaml"))?;
        let layer = serde_json::to_value(yaml)
            .with_context(|| format!("config layer {idx} has no json representation"))?;
        // An empty layer parses as null: no overrides.
        if !layer.is_null() {
            merge_layer(&mut merged, layer);
        }
    }

    enforce_no_secret_literals(&merged)?;

    // serde_json's default map is ordered, so this rendering is key-sorted.
    let canonical_json = serde_json::to_string(&merged).context("render canonical config")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; anything else in `overlay` replaces `base`.
fn merge_layer(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(into), Value::Object(from)) => {
            for (key, value) in from {
                merge_layer(into.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let hit = pointer::leaves(v)
        .into_iter()
        .find(|(_, leaf)| leaf.as_str().is_some_and(looks_like_secret));
    if let Some((ptr, _)) = hit {
        bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_earlier_ones() {
        let mut merged =
            serde_json::json!({"prices": {"stale_after_days": 3, "expire_after_days": 30}});
        merge_layer(&mut merged, serde_json::json!({"prices": {"stale_after_days": 2}}));
        assert_eq!(merged["prices"]["stale_after_days"], 2);
        assert_eq!(merged["prices"]["expire_after_days"], 30);
    }

    #[test]
    fn short_strings_are_never_secrets() {
        assert!(!looks_like_secret("sk-1"));
        assert!(looks_like_secret("postgres://user:pw@host/db"));
    }
}
