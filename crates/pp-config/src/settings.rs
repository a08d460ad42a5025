//! Typed view over the merged config JSON.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SyncSettings {
    pub sync: RunSettings,
    pub prices: PriceSettings,
    pub fuelcheck: FuelCheckSettings,
    pub stores: StoreSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunSettings {
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSettings {
    pub stale_after_days: i64,
    pub expire_after_days: i64,
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            stale_after_days: 3,
            expire_after_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelCheckSettings {
    pub base_url: String,
    /// IANA zone the upstream timestamps are expressed in.
    pub timezone: String,
    pub token_cache_path: String,
    pub max_token_attempts: u32,
    pub timeout_secs: u64,
}

impl Default for FuelCheckSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.onegov.nsw.gov.au".to_string(),
            timezone: "Australia/Sydney".to_string(),
            token_cache_path: ".cache/fuelcheck-token.json".to_string(),
            max_token_attempts: 3,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreSettings {
    pub document: DocumentStoreSettings,
    pub realtime: RealtimeStoreSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStoreKind {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreSettings {
    pub kind: DocumentStoreKind,
    pub url_env: String,
}

impl Default for DocumentStoreSettings {
    fn default() -> Self {
        Self {
            kind: DocumentStoreKind::Postgres,
            url_env: "PP_DATABASE_URL".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeStoreKind {
    Rest,
    Memory,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeStoreSettings {
    pub kind: RealtimeStoreKind,
    pub base_url: String,
    pub auth_env: String,
}

impl Default for RealtimeStoreSettings {
    fn default() -> Self {
        Self {
            kind: RealtimeStoreKind::None,
            base_url: "https://petrol-patrol.firebaseio.com".to_string(),
            auth_env: "PP_REALTIME_AUTH".to_string(),
        }
    }
}

impl SyncSettings {
    /// Extract and validate settings from merged config JSON.
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let settings: SyncSettings =
            serde_json::from_value(config_json.clone()).context("CONFIG_INVALID: settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.prices;
        if p.stale_after_days < 0 || p.expire_after_days < 0 {
            bail!("CONFIG_INVALID: price thresholds must be non-negative");
        }
        if p.expire_after_days <= p.stale_after_days {
            bail!(
                "CONFIG_INVALID: prices.expire_after_days ({}) must be greater than prices.stale_after_days ({})",
                p.expire_after_days,
                p.stale_after_days
            );
        }
        if self.fuelcheck.max_token_attempts == 0 {
            bail!("CONFIG_INVALID: fuelcheck.max_token_attempts must be at least 1");
        }
        if self.fuelcheck.base_url.trim().is_empty() {
            bail!("CONFIG_INVALID: fuelcheck.base_url is empty");
        }
        Ok(())
    }
}
