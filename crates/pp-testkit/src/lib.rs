//! pp-testkit
//!
//! Fixtures and in-process collaborators for driving whole sync runs in
//! tests: a static upstream, and stores that can be told to fail.

use std::fs;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use pp_fuelcheck::geohash;
use pp_reconcile::SECS_PER_DAY;
use pp_schemas::{Brand, Fueltype, Location, Price, Station};

mod stores;
mod upstream;

pub use stores::{FlakyDocumentStore, FlakyRealtimeStore};
pub use upstream::StaticUpstream;

/// Fixed run instant used across scenarios: 2024-06-01T12:00:00Z.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_717_243_200, 0)
        .single()
        .unwrap_or_default()
}

/// Unix time `days` whole days before [`fixed_now`].
pub fn days_ago(days: i64) -> i64 {
    fixed_now().timestamp() - days * SECS_PER_DAY
}

pub fn brands(names: &[&str]) -> Vec<Brand> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| Brand::new(*n, i as u32))
        .collect()
}

pub fn fueltypes(codes: &[(&str, &str)]) -> Vec<Fueltype> {
    codes
        .iter()
        .enumerate()
        .map(|(i, (code, name))| Fueltype::new(*code, *name, i as u32))
        .collect()
}

/// A Sydney station with a geohash derived from its coordinates.
pub fn station(id: &str, name: &str, brand: &str, latitude: f64, longitude: f64) -> Station {
    Station {
        id: id.to_string(),
        name: name.to_string(),
        brand: brand.to_string(),
        active: true,
        location: Location {
            latitude,
            longitude,
        },
        g: geohash::encode(latitude, longitude, geohash::STATION_PRECISION),
        l: [latitude, longitude],
        street: "1 George St".to_string(),
        suburb: "SYDNEY".to_string(),
        state: "NSW".to_string(),
        postcode: Some(2000),
    }
}

pub fn price(id: &str, fueltype: &str, value: f64, age_days: i64) -> Price {
    Price::new(id, fueltype, value, days_ago(age_days))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpstreamFixture {
    brands: Vec<Brand>,
    fueltypes: Vec<Fueltype>,
    stations: Vec<Station>,
    prices: Vec<Price>,
}

/// Load an upstream snapshot from a JSON fixture with optional `brands`,
/// `fueltypes`, `stations` and `prices` arrays.
pub fn load_upstream_json(path: &str) -> Result<StaticUpstream> {
    let s = fs::read_to_string(path).with_context(|| format!("read upstream fixture: {path}"))?;
    let fx: UpstreamFixture =
        serde_json::from_str(&s).with_context(|| format!("parse upstream fixture: {path}"))?;
    Ok(StaticUpstream::new()
        .with_brands(fx.brands)
        .with_fueltypes(fx.fueltypes)
        .with_stations(fx.stations)
        .with_prices(fx.prices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brands_take_list_position_as_order() {
        let b = brands(&["Shell", "BP"]);
        assert_eq!(b[1], Brand::new("BP", 1));
    }

    #[test]
    fn station_geohash_matches_location() {
        let s = station("1", "Shell Sydney", "Shell", -33.8688, 151.2093);
        assert_eq!(s.g, "r3gx2f77bn");
        assert_eq!(s.l, [-33.8688, 151.2093]);
    }

    #[test]
    fn malformed_fixture_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"brands": [{"name": "Shell"}]}"#).unwrap();

        let err = load_upstream_json(path.to_str().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("parse upstream fixture"));
    }

    #[test]
    fn days_ago_is_whole_days_back() {
        assert_eq!(fixed_now().timestamp() - days_ago(31), 31 * SECS_PER_DAY);
    }
}
