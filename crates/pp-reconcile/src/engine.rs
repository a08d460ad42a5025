use std::collections::{BTreeMap, BTreeSet};

use pp_schemas::Entity;
use serde_json::Value;

use crate::fingerprint::{collection_hash, fingerprint};

/// Write intents for one entity collection.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityDiff<T> {
    /// Upstream records with no structurally equal stored counterpart.
    pub to_enable: Vec<T>,
    /// Stored records with no structurally equal upstream counterpart, already
    /// flipped to `active = false`.
    pub to_disable: Vec<T>,
    /// Records present verbatim on both sides. Never written; only hashed.
    pub unchanged: Vec<T>,
}

impl<T: Entity> EntityDiff<T> {
    pub fn is_noop(&self) -> bool {
        self.to_enable.is_empty() && self.to_disable.is_empty()
    }

    /// Disables whose key is not re-enabled in this pass.
    ///
    /// A changed record shows up as a new version in `to_enable` and its old
    /// version in `to_disable`; both address the same document, and the new
    /// version wins.
    pub fn effective_disables(&self) -> Vec<&T> {
        let enabled: BTreeSet<String> = self.to_enable.iter().map(|e| e.key()).collect();
        self.to_disable
            .iter()
            .filter(|d| !enabled.contains(&d.key()))
            .collect()
    }

    /// Documents of the collection after the writes land.
    pub fn resulting_documents(&self) -> Vec<Value> {
        self.to_enable
            .iter()
            .chain(self.effective_disables())
            .chain(self.unchanged.iter())
            .map(|e| e.to_document())
            .collect()
    }

    pub fn aggregate_hash(&self) -> String {
        collection_hash(&self.resulting_documents())
    }
}

/// Reconcile an upstream snapshot against a stored snapshot.
///
/// Equality is structural (fingerprint), not by key, and multiset-aware: two
/// identical upstream records need two identical stored records to be
/// considered present.
///
/// - empty `stored`: everything upstream is enabled.
/// - empty `upstream`: everything stored is disabled.
/// - `upstream == stored` as multisets: no writes.
pub fn reconcile<T: Entity>(upstream: &[T], stored: &[T]) -> EntityDiff<T> {
    let up = fingerprinted(upstream);
    let st = fingerprinted(stored);

    let mut stored_counts = counts(&st);
    let mut to_enable = Vec::new();
    let mut unchanged = Vec::new();
    for (fp, rec) in &up {
        if take_one(&mut stored_counts, fp) {
            unchanged.push((*rec).clone());
        } else {
            to_enable.push((*rec).clone());
        }
    }

    let mut upstream_counts = counts(&up);
    let mut to_disable = Vec::new();
    for (fp, rec) in &st {
        if !take_one(&mut upstream_counts, fp) {
            to_disable.push(rec.deactivated());
        }
    }

    EntityDiff {
        to_enable,
        to_disable,
        unchanged,
    }
}

fn fingerprinted<T: Entity>(records: &[T]) -> Vec<(String, &T)> {
    records
        .iter()
        .map(|r| (fingerprint(&r.to_document()), r))
        .collect()
}

fn counts<T>(records: &[(String, &T)]) -> BTreeMap<String, usize> {
    let mut out: BTreeMap<String, usize> = BTreeMap::new();
    for (fp, _) in records {
        *out.entry(fp.clone()).or_default() += 1;
    }
    out
}

fn take_one(counts: &mut BTreeMap<String, usize>, fp: &str) -> bool {
    match counts.get_mut(fp) {
        Some(n) if *n > 0 => {
            *n -= 1;
            true
        }
        _ => false,
    }
}
