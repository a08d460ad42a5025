//! pp-stats
//!
//! Per-fueltype price statistics. Pure computation over an in-memory price
//! snapshot; persisting the result is the caller's job.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use pp_schemas::Price;

mod measures;

pub use measures::{distribution, max_by_price, mean, median, min_by_price, stdev};

/// Aggregate over the prices of one fueltype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatBucket {
    /// floor(price) -> number of prices in that whole-cent band.
    pub distribution: BTreeMap<i64, usize>,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub stdev: f64,
    pub count: usize,
    pub timestamp: i64,
}

/// A price left out of the statistics pass.
#[derive(Clone, Debug, PartialEq)]
pub enum ComputationError {
    InvalidPrice {
        id: String,
        fueltype: String,
        price: f64,
    },
}

impl fmt::Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputationError::InvalidPrice {
                id,
                fueltype,
                price,
            } => write!(f, "invalid price {price} for station {id} fueltype {fueltype}"),
        }
    }
}

impl std::error::Error for ComputationError {}

/// Result of one statistics pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Statistics {
    pub timestamp: i64,
    pub buckets: BTreeMap<String, StatBucket>,
    pub excluded: Vec<ComputationError>,
}

impl Statistics {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Storage form: `{ "timestamp": .., "<fueltype>": <bucket>, .. }`.
    pub fn to_document(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("timestamp".to_string(), Value::from(self.timestamp));
        for (fueltype, bucket) in &self.buckets {
            map.insert(
                fueltype.clone(),
                serde_json::to_value(bucket).unwrap_or(Value::Null),
            );
        }
        Value::Object(map)
    }
}

fn is_valid(p: &Price) -> bool {
    p.price.is_finite() && p.price >= 0.0
}

/// Group `prices` by fueltype and compute one bucket per non-empty group.
///
/// Invalid prices (non-finite or negative) are excluded from their group and
/// reported in `excluded`; a group left empty by exclusion gets no bucket.
pub fn compute_statistics(prices: &[Price], timestamp: i64) -> Statistics {
    let mut groups: BTreeMap<&str, Vec<&Price>> = BTreeMap::new();
    let mut excluded = Vec::new();

    for p in prices {
        if !is_valid(p) {
            excluded.push(ComputationError::InvalidPrice {
                id: p.id.clone(),
                fueltype: p.fueltype.clone(),
                price: p.price,
            });
            continue;
        }
        groups.entry(p.fueltype.as_str()).or_default().push(p);
    }

    let buckets = groups
        .into_iter()
        .filter_map(|(fueltype, group)| {
            bucket(&group, timestamp).map(|b| (fueltype.to_string(), b))
        })
        .collect();

    Statistics {
        timestamp,
        buckets,
        excluded,
    }
}

fn bucket(group: &[&Price], timestamp: i64) -> Option<StatBucket> {
    let values: Vec<f64> = group.iter().map(|p| p.price).collect();
    Some(StatBucket {
        distribution: distribution(&values),
        min: min_by_price(group)?.price,
        max: max_by_price(group)?.price,
        mean: mean(&values)?,
        median: median(&values)?,
        stdev: stdev(&values)?,
        count: values.len(),
        timestamp,
    })
}
