//! pp-reconcile
//!
//! Reconciliation engine for the sync pipeline.
//!
//! - `fingerprint`: order-insensitive structural hashing of JSON documents.
//! - `engine`: set reconciliation of reference entities (enable / soft-disable).
//! - `prices`: price lifecycle (update / expire, stale annotation).
//!
//! Deterministic, pure logic. No IO. Callers fetch snapshots and apply the
//! resulting write intents.

pub mod fingerprint;

mod engine;
mod prices;

pub use engine::{reconcile, EntityDiff};
pub use fingerprint::{canonical_json, collection_hash, fingerprint, fingerprint_of, price_key};
pub use prices::{
    age_days, annotate_staleness, is_expired, is_stale, latest_per_key, reconcile_prices,
    PolicyError, PriceDiff, PricePolicy, SECS_PER_DAY,
};
