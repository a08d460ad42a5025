//! pp-schemas
//!
//! Shared record types for the sync pipeline: reference entities (brands,
//! fueltypes, stations), prices, collection names and the collaborator
//! initialization gate.
//!
//! Pure data. No IO.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Logical collection names shared by every store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Brands,
    Fueltypes,
    Stations,
    Prices,
    Statistics,
    Hash,
}

impl Collection {
    /// Collections that are reconciled by a sync run, in report order.
    pub const SYNCED: [Collection; 5] = [
        Collection::Brands,
        Collection::Fueltypes,
        Collection::Stations,
        Collection::Prices,
        Collection::Statistics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Brands => "brands",
            Collection::Fueltypes => "fueltypes",
            Collection::Stations => "stations",
            Collection::Prices => "prices",
            Collection::Statistics => "statistics",
            Collection::Hash => "hash",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brands" => Some(Collection::Brands),
            "fueltypes" => Some(Collection::Fueltypes),
            "stations" => Some(Collection::Stations),
            "prices" => Some(Collection::Prices),
            "statistics" => Some(Collection::Statistics),
            "hash" => Some(Collection::Hash),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Initialization gate
// ---------------------------------------------------------------------------

/// Collaborator lifecycle. Operations issued before `Ready` are no-ops that
/// return empty/neutral results.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum InitState {
    #[default]
    Uninitialized,
    Ready,
    Failed(String),
}

impl InitState {
    pub fn is_ready(&self) -> bool {
        matches!(self, InitState::Ready)
    }
}

// ---------------------------------------------------------------------------
// Active flag
// ---------------------------------------------------------------------------

/// Raw `active` field as found on a stored or upstream document.
///
/// Resolved exactly once at ingestion; entities carry a plain `bool` after that.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveFlag {
    True,
    False,
    /// Field missing or null: implicitly active.
    Absent,
}

impl ActiveFlag {
    /// Read the flag from a JSON document. Anything other than a literal
    /// boolean (or a missing/null field) counts as inactive.
    pub fn from_document(doc: &Value) -> Self {
        match doc.get("active") {
            None | Some(Value::Null) => ActiveFlag::Absent,
            Some(Value::Bool(true)) => ActiveFlag::True,
            Some(_) => ActiveFlag::False,
        }
    }

    pub fn resolve(self) -> bool {
        match self {
            ActiveFlag::True | ActiveFlag::Absent => true,
            ActiveFlag::False => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Entity contract
// ---------------------------------------------------------------------------

/// A soft-deletable reference record with a natural key.
///
/// Identity for reconciliation is the full structure of the record, not the key;
/// the key only addresses the document in storage.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const COLLECTION: Collection;

    /// Natural key (brand name, fueltype code, station id).
    fn key(&self) -> String;

    fn is_active(&self) -> bool;

    /// Same record with `active` replaced; every other field untouched.
    fn with_active(&self, active: bool) -> Self;

    fn deactivated(&self) -> Self {
        self.with_active(false)
    }

    /// Document form written to stores and used for fingerprinting.
    fn to_document(&self) -> Value {
        // Derived Serialize over plain fields never errors.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Brand reference record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub name: String,
    pub active: bool,
    pub order: u32,
}

impl Brand {
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        Self {
            name: name.into(),
            active: true,
            order,
        }
    }
}

impl Entity for Brand {
    const COLLECTION: Collection = Collection::Brands;

    fn key(&self) -> String {
        self.name.clone()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn with_active(&self, active: bool) -> Self {
        Self {
            active,
            ..self.clone()
        }
    }
}

/// Fuel type reference record (e.g. `E10`, `U91`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fueltype {
    pub code: String,
    pub name: String,
    pub active: bool,
    pub order: u32,
}

impl Fueltype {
    pub fn new(code: impl Into<String>, name: impl Into<String>, order: u32) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            active: true,
            order,
        }
    }
}

impl Entity for Fueltype {
    const COLLECTION: Collection = Collection::Fueltypes;

    fn key(&self) -> String {
        self.code.clone()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn with_active(&self, active: bool) -> Self {
        Self {
            active,
            ..self.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Fuel station reference record.
///
/// `g` is the geohash of the location and `l` the `[latitude, longitude]` pair,
/// the shape geo-query clients index on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub active: bool,
    pub location: Location,
    pub g: String,
    pub l: [f64; 2],
    pub street: String,
    pub suburb: String,
    pub state: String,
    pub postcode: Option<u32>,
}

impl Entity for Station {
    const COLLECTION: Collection = Collection::Stations;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn with_active(&self, active: bool) -> Self {
        Self {
            active,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// Point-in-time price of one fuel type at one station.
///
/// `time` is the last-update instant in unix seconds. `stale` is a display
/// annotation derived from the age of `time`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    pub fueltype: String,
    pub price: f64,
    pub time: i64,
    #[serde(default)]
    pub stale: bool,
}

impl Price {
    pub fn new(id: impl Into<String>, fueltype: impl Into<String>, price: f64, time: i64) -> Self {
        Self {
            id: id.into(),
            fueltype: fueltype.into(),
            price,
            time,
            stale: false,
        }
    }

    /// The natural key fields, as a document. Price storage keys are the
    /// fingerprint of this value.
    pub fn key_document(&self) -> Value {
        serde_json::json!({ "id": self.id, "fueltype": self.fueltype })
    }

    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Outcome of decoding a raw document snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Ingested<T> {
    /// Decoded active records, input order preserved.
    pub records: Vec<T>,
    /// Documents skipped because they resolved to inactive.
    pub inactive: usize,
    /// `(index, reason)` for documents that failed to decode.
    pub rejected: Vec<(usize, String)>,
}

impl<T> Default for Ingested<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            inactive: 0,
            rejected: Vec::new(),
        }
    }
}

/// Decode stored entity documents, resolving `active` once and keeping only
/// active records.
pub fn ingest_entities<T: Entity>(docs: &[Value]) -> Ingested<T> {
    let mut out = Ingested::default();
    for (idx, doc) in docs.iter().enumerate() {
        let active = ActiveFlag::from_document(doc).resolve();
        if !active {
            out.inactive += 1;
            continue;
        }
        let mut doc = doc.clone();
        if let Value::Object(map) = &mut doc {
            map.insert("active".to_string(), Value::Bool(true));
        }
        match serde_json::from_value::<T>(doc) {
            Ok(rec) => out.records.push(rec),
            Err(e) => out.rejected.push((idx, e.to_string())),
        }
    }
    out
}

/// Decode stored price documents.
pub fn ingest_prices(docs: &[Value]) -> Ingested<Price> {
    let mut out = Ingested::default();
    for (idx, doc) in docs.iter().enumerate() {
        match serde_json::from_value::<Price>(doc.clone()) {
            Ok(p) => out.records.push(p),
            Err(e) => out.rejected.push((idx, e.to_string())),
        }
    }
    out
}

/// Storage-safe document id: the first `/` is removed.
pub fn sanitise_id(id: &str) -> String {
    id.replacen('/', "", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn active_flag_resolution() {
        assert_eq!(ActiveFlag::from_document(&json!({"name": "a"})), ActiveFlag::Absent);
        assert_eq!(ActiveFlag::from_document(&json!({"active": null})), ActiveFlag::Absent);
        assert_eq!(ActiveFlag::from_document(&json!({"active": true})), ActiveFlag::True);
        assert_eq!(ActiveFlag::from_document(&json!({"active": false})), ActiveFlag::False);
        assert_eq!(ActiveFlag::from_document(&json!({"active": "yes"})), ActiveFlag::False);
        assert!(ActiveFlag::Absent.resolve());
        assert!(!ActiveFlag::False.resolve());
    }

    #[test]
    fn deactivate_preserves_other_fields() {
        let b = Brand::new("Shell", 3);
        let d = b.deactivated();
        assert_eq!(d.name, "Shell");
        assert_eq!(d.order, 3);
        assert!(!d.active);
    }

    #[test]
    fn collection_names_round_trip() {
        for c in Collection::SYNCED {
            assert_eq!(Collection::parse(c.as_str()), Some(c));
        }
        assert_eq!(Collection::parse("nope"), None);
    }

    #[test]
    fn sanitise_removes_first_slash_only() {
        assert_eq!(sanitise_id("7-Eleven/Shell"), "7-ElevenShell");
        assert_eq!(sanitise_id("a/b/c"), "ab/c");
        assert_eq!(sanitise_id("plain"), "plain");
    }

    #[test]
    fn init_state_default_is_uninitialized() {
        let s = InitState::default();
        assert!(!s.is_ready());
        assert!(InitState::Ready.is_ready());
        assert!(!InitState::Failed("x".into()).is_ready());
    }
}
