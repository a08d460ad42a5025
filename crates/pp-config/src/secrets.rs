//! Runtime secret resolution.
//!
//! Config YAML stores env var NAMES only (e.g. `fuelcheck.keys_env.api_key:
//! "FUELCHECK_API_KEY"`). Callers resolve them once at startup with
//! [`resolve_secrets`] and pass the result into constructors.
//!
//! `Debug` output redacts every value and errors name the variable, never its
//! contents.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::settings::{DocumentStoreKind, RealtimeStoreKind, SyncSettings};
use crate::ConfigScope;

const REDACTED: &str = "<REDACTED>";

/// Secrets for one invocation. **Values are redacted in `Debug` output.**
#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    pub fuelcheck_api_key: Option<String>,
    pub fuelcheck_api_secret: Option<String>,
    pub database_url: Option<String>,
    pub realtime_auth: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("fuelcheck_api_key", &self.fuelcheck_api_key.as_ref().map(|_| REDACTED))
            .field(
                "fuelcheck_api_secret",
                &self.fuelcheck_api_secret.as_ref().map(|_| REDACTED),
            )
            .field("database_url", &self.database_url.as_ref().map(|_| REDACTED))
            .field("realtime_auth", &self.realtime_auth.as_ref().map(|_| REDACTED))
            .finish()
    }
}

struct SecretEnvNames {
    api_key_var: String,
    api_secret_var: String,
    database_url_var: String,
    realtime_auth_var: String,
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn parse_env_names(config_json: &Value) -> SecretEnvNames {
    SecretEnvNames {
        api_key_var: read_str_at(config_json, "/fuelcheck/keys_env/api_key")
            .unwrap_or_else(|| "FUELCHECK_API_KEY".to_string()),
        api_secret_var: read_str_at(config_json, "/fuelcheck/keys_env/api_secret")
            .unwrap_or_else(|| "FUELCHECK_API_SECRET".to_string()),
        database_url_var: read_str_at(config_json, "/stores/document/url_env")
            .unwrap_or_else(|| "PP_DATABASE_URL".to_string()),
        realtime_auth_var: read_str_at(config_json, "/stores/realtime/auth_env")
            .unwrap_or_else(|| "PP_REALTIME_AUTH".to_string()),
    }
}

fn require(value: &Option<String>, scope: ConfigScope, var: &str, what: &str) -> Result<()> {
    if value.is_none() {
        bail!(
            "SECRETS_MISSING scope={}: required env var '{}' ({}) is not set or empty",
            scope.as_str(),
            var,
            what,
        );
    }
    Ok(())
}

/// Resolve every secret named by the config.
///
/// | Scope    | Required                                                    |
/// |----------|-------------------------------------------------------------|
/// | SYNC     | FuelCheck key and secret; database URL when the document store is postgres; realtime auth when the realtime store is rest |
/// | DATABASE | database URL                                                |
pub fn resolve_secrets(config_json: &Value, scope: ConfigScope) -> Result<ResolvedSecrets> {
    let names = parse_env_names(config_json);
    let settings = SyncSettings::from_config_json(config_json)?;

    let secrets = ResolvedSecrets {
        fuelcheck_api_key: resolve_env(&names.api_key_var),
        fuelcheck_api_secret: resolve_env(&names.api_secret_var),
        database_url: resolve_env(&names.database_url_var),
        realtime_auth: resolve_env(&names.realtime_auth_var),
    };

    match scope {
        ConfigScope::Sync => {
            require(&secrets.fuelcheck_api_key, scope, &names.api_key_var, "FuelCheck api_key")?;
            require(
                &secrets.fuelcheck_api_secret,
                scope,
                &names.api_secret_var,
                "FuelCheck api_secret",
            )?;
            if settings.stores.document.kind == DocumentStoreKind::Postgres {
                require(&secrets.database_url, scope, &names.database_url_var, "database url")?;
            }
            if settings.stores.realtime.kind == RealtimeStoreKind::Rest {
                require(
                    &secrets.realtime_auth,
                    scope,
                    &names.realtime_auth_var,
                    "realtime auth",
                )?;
            }
        }
        ConfigScope::Database => {
            require(&secrets.database_url, scope, &names.database_url_var, "database url")?;
        }
    }

    Ok(secrets)
}
