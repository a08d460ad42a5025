//! OAuth access token and its on-disk cache.
//!
//! The token endpoint returns `issued_at` in milliseconds and `expires_in` in
//! seconds, both usually as strings. The cache file stores the response as-is.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::FuelCheckError;

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Issue instant, unix milliseconds.
    #[serde(deserialize_with = "number_or_string")]
    pub issued_at: i64,
    /// Lifetime in seconds.
    #[serde(deserialize_with = "number_or_string")]
    pub expires_in: i64,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<REDACTED>")
            .field("issued_at", &self.issued_at)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let elapsed_secs = (now.timestamp_millis() - self.issued_at) / 1000;
        elapsed_secs >= self.expires_in
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

fn number_or_string<'de, D>(de: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Str(String),
    }

    match Raw::deserialize(de)? {
        Raw::Int(n) => Ok(n),
        Raw::Float(f) => Ok(f as i64),
        Raw::Str(s) => s.trim().parse::<i64>().map_err(serde::de::Error::custom),
    }
}

/// JSON file holding the last issued token.
#[derive(Clone, Debug)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached token, if present, readable and not expired at `now`.
    pub fn load_valid(&self, now: DateTime<Utc>) -> Option<AccessToken> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no cached token");
                return None;
            }
        };
        let token: AccessToken = match serde_json::from_str(&raw) {
            Ok(t) => t,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "unreadable cached token");
                return None;
            }
        };
        if token.is_expired(now) {
            debug!(path = %self.path.display(), "cached token expired");
            return None;
        }
        Some(token)
    }

    pub fn store(&self, token: &AccessToken) -> Result<(), FuelCheckError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| FuelCheckError::TokenCache(format!("{}: {e}", parent.display())))?;
            }
        }
        let body = serde_json::to_string_pretty(token)
            .map_err(|e| FuelCheckError::TokenCache(e.to_string()))?;
        fs::write(&self.path, body)
            .map_err(|e| FuelCheckError::TokenCache(format!("{}: {e}", self.path.display())))
    }

    /// Forget the cached token. A missing file is not an error.
    pub fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "token cache not removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn decodes_string_fields() {
        let t: AccessToken = serde_json::from_str(
            r#"{"access_token":"abc","issued_at":"1700000000000","expires_in":"43199","token_type":"BearerToken"}"#,
        )
        .unwrap();
        assert_eq!(t.issued_at, 1_700_000_000_000);
        assert_eq!(t.expires_in, 43_199);
        assert_eq!(t.bearer(), "Bearer abc");
    }

    #[test]
    fn expiry_boundary() {
        let t = AccessToken {
            access_token: "x".into(),
            issued_at: 1_700_000_000_000,
            expires_in: 60,
        };
        assert!(!t.is_expired(at(1_700_000_059)));
        assert!(t.is_expired(at(1_700_000_060)));
    }

    #[test]
    fn cache_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("nested").join("token.json"));
        let t = AccessToken {
            access_token: "x".into(),
            issued_at: 1_700_000_000_000,
            expires_in: 3600,
        };

        assert!(cache.load_valid(at(1_700_000_001)).is_none());
        cache.store(&t).unwrap();
        assert_eq!(cache.load_valid(at(1_700_000_001)), Some(t));
        assert!(cache.load_valid(at(1_700_003_600)).is_none());

        cache.clear();
        assert!(cache.load_valid(at(1_700_000_001)).is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let t = AccessToken {
            access_token: "super-secret".into(),
            issued_at: 0,
            expires_in: 1,
        };
        assert!(!format!("{t:?}").contains("super-secret"));
    }
}
