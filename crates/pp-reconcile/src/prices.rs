//! Price lifecycle.
//!
//! Prices are point-in-time facts keyed by `(station id, fueltype)`. They are
//! overwritten rather than soft-disabled, and deleted from the primary store
//! once they age past the expiry threshold.
//!
//! Ages are whole days, truncated: `(now - time) / 86_400`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use pp_schemas::Price;

use crate::fingerprint::{fingerprint, price_key};

pub const SECS_PER_DAY: i64 = 86_400;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Staleness and expiry thresholds, in whole days.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricePolicy {
    stale_after_days: i64,
    expire_after_days: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyError {
    /// Thresholds must be non-negative.
    Negative { stale_after_days: i64, expire_after_days: i64 },
    /// Expiry must be strictly longer than staleness.
    ExpiryNotAfterStale { stale_after_days: i64, expire_after_days: i64 },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::Negative {
                stale_after_days,
                expire_after_days,
            } => write!(
                f,
                "price thresholds must be non-negative (stale={stale_after_days}d expire={expire_after_days}d)"
            ),
            PolicyError::ExpiryNotAfterStale {
                stale_after_days,
                expire_after_days,
            } => write!(
                f,
                "expire_after_days ({expire_after_days}) must be greater than stale_after_days ({stale_after_days})"
            ),
        }
    }
}

impl std::error::Error for PolicyError {}

impl Default for PricePolicy {
    fn default() -> Self {
        Self {
            stale_after_days: 3,
            expire_after_days: 30,
        }
    }
}

impl PricePolicy {
    pub fn new(stale_after_days: i64, expire_after_days: i64) -> Result<Self, PolicyError> {
        if stale_after_days < 0 || expire_after_days < 0 {
            return Err(PolicyError::Negative {
                stale_after_days,
                expire_after_days,
            });
        }
        if expire_after_days <= stale_after_days {
            return Err(PolicyError::ExpiryNotAfterStale {
                stale_after_days,
                expire_after_days,
            });
        }
        Ok(Self {
            stale_after_days,
            expire_after_days,
        })
    }

    pub fn stale_after_days(&self) -> i64 {
        self.stale_after_days
    }

    pub fn expire_after_days(&self) -> i64 {
        self.expire_after_days
    }
}

// ---------------------------------------------------------------------------
// Age classification
// ---------------------------------------------------------------------------

/// Whole days between `time` (unix seconds) and `now`, truncated toward zero.
/// Future timestamps give zero or a negative age.
pub fn age_days(time: i64, now: DateTime<Utc>) -> i64 {
    (now.timestamp() - time) / SECS_PER_DAY
}

pub fn is_stale(price: &Price, policy: &PricePolicy, now: DateTime<Utc>) -> bool {
    age_days(price.time, now) >= policy.stale_after_days
}

pub fn is_expired(price: &Price, policy: &PricePolicy, now: DateTime<Utc>) -> bool {
    age_days(price.time, now) >= policy.expire_after_days
}

/// Set the display-only `stale` flag on every price.
pub fn annotate_staleness(prices: &mut [Price], policy: &PricePolicy, now: DateTime<Utc>) {
    for p in prices.iter_mut() {
        p.stale = is_stale(p, policy, now);
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Write intents for the price collection.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceDiff {
    /// New or changed upstream prices (structural left difference).
    pub to_update: Vec<Price>,
    /// Prices of the current view that have aged past expiry.
    pub to_expire: Vec<Price>,
    /// Best-known current view: one record per price key, upstream wins.
    candidates: Vec<Price>,
}

impl PriceDiff {
    pub fn is_noop(&self) -> bool {
        self.to_update.is_empty() && self.to_expire.is_empty()
    }

    /// Updates to write, excluding any that are about to be expired.
    pub fn upserts(&self) -> Vec<&Price> {
        let expired = key_set(&self.to_expire);
        self.to_update
            .iter()
            .filter(|p| !expired.contains(&price_key(p)))
            .collect()
    }

    /// Current view after expiry.
    pub fn current(&self) -> Vec<&Price> {
        let expired = key_set(&self.to_expire);
        self.candidates
            .iter()
            .filter(|p| !expired.contains(&price_key(p)))
            .collect()
    }
}

/// One price per key: the most recent `time` wins, ties keep the first seen.
/// Input order of the kept records is preserved.
pub fn latest_per_key(prices: &[Price]) -> Vec<Price> {
    let mut winner: BTreeMap<String, usize> = BTreeMap::new();
    for (idx, p) in prices.iter().enumerate() {
        winner
            .entry(price_key(p))
            .and_modify(|w| {
                if p.time > prices[*w].time {
                    *w = idx;
                }
            })
            .or_insert(idx);
    }
    let keep: BTreeSet<usize> = winner.into_values().collect();
    prices
        .iter()
        .enumerate()
        .filter(|(idx, _)| keep.contains(idx))
        .map(|(_, p)| p.clone())
        .collect()
}

/// Reconcile upstream prices against stored prices at instant `now`.
///
/// Upstream is first reduced to one record per key with [`latest_per_key`].
/// The candidate set for expiry is `to_update` plus every stored price whose
/// key is not being updated, so a fresh upstream price is never expired on
/// account of the stale version it replaces.
pub fn reconcile_prices(
    upstream: &[Price],
    stored: &[Price],
    policy: &PricePolicy,
    now: DateTime<Utc>,
) -> PriceDiff {
    let mut stored_counts: BTreeMap<String, usize> = BTreeMap::new();
    for p in stored {
        *stored_counts.entry(fingerprint(&p.to_document())).or_default() += 1;
    }

    let mut to_update = Vec::new();
    for p in &latest_per_key(upstream) {
        let fp = fingerprint(&p.to_document());
        match stored_counts.get_mut(&fp) {
            Some(n) if *n > 0 => *n -= 1,
            _ => to_update.push(p.clone()),
        }
    }

    let updated_keys = key_set(&to_update);
    let mut candidates = to_update.clone();
    candidates.extend(
        stored
            .iter()
            .filter(|p| !updated_keys.contains(&price_key(p)))
            .cloned(),
    );

    let to_expire = candidates
        .iter()
        .filter(|p| is_expired(p, policy, now))
        .cloned()
        .collect();

    PriceDiff {
        to_update,
        to_expire,
        candidates,
    }
}

fn key_set(prices: &[Price]) -> BTreeSet<String> {
    prices.iter().map(price_key).collect()
}
