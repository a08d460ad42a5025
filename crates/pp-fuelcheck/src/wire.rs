//! Upstream response shapes and their conversion into records.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use pp_reconcile::{annotate_staleness, is_expired, PricePolicy};
use pp_schemas::{Brand, Fueltype, Location, Price, Station};

use crate::address::split_address;
use crate::geohash::{self, STATION_PRECISION};
use crate::timestamp;

#[derive(Debug, Deserialize)]
pub(crate) struct Items<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// `/FuelCheckRefData/v1/fuel/lovs`
#[derive(Debug, Deserialize)]
pub(crate) struct ReferenceData {
    pub brands: Items<BrandItem>,
    pub fueltypes: Items<FueltypeItem>,
    pub stations: Items<StationItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BrandItem {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FueltypeItem {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StationItem {
    #[serde(deserialize_with = "id_string")]
    pub code: String,
    pub name: String,
    pub brand: String,
    #[serde(default)]
    pub address: String,
    pub location: LocationItem,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationItem {
    pub latitude: f64,
    pub longitude: f64,
}

/// `/FuelPriceCheck/v1/fuel/prices`
///
/// Items stay raw so one malformed entry cannot fail the whole payload.
#[derive(Debug, Deserialize)]
pub(crate) struct PriceData {
    #[serde(default)]
    pub prices: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PriceItem {
    #[serde(deserialize_with = "id_string")]
    pub stationcode: String,
    pub fueltype: String,
    pub price: f64,
    pub lastupdated: String,
}

/// Station codes arrive as either JSON numbers or strings.
fn id_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Brands in upstream order; `order` is the position in the list.
pub(crate) fn brands(items: &[BrandItem]) -> Vec<Brand> {
    items
        .iter()
        .enumerate()
        .map(|(i, b)| Brand::new(b.name.clone(), i as u32))
        .collect()
}

pub(crate) fn fueltypes(items: &[FueltypeItem]) -> Vec<Fueltype> {
    items
        .iter()
        .enumerate()
        .map(|(i, f)| Fueltype::new(f.code.clone(), f.name.clone(), i as u32))
        .collect()
}

pub(crate) fn station(item: &StationItem) -> Station {
    let lat = item.location.latitude;
    let lon = item.location.longitude;
    let address = split_address(&item.address);
    Station {
        id: item.code.clone(),
        name: item.name.clone(),
        brand: item.brand.clone(),
        active: true,
        location: Location {
            latitude: lat,
            longitude: lon,
        },
        g: geohash::encode(lat, lon, STATION_PRECISION),
        l: [lat, lon],
        street: address.street,
        suburb: address.suburb,
        state: address.state,
        postcode: address.postcode,
    }
}

/// Counts from converting one upstream price list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PriceIngest {
    pub kept: usize,
    pub expired: usize,
    pub undated: usize,
    /// Items missing a field or carrying a non-numeric price.
    pub malformed: usize,
}

/// Convert upstream prices, dropping malformed and already expired items and
/// annotating staleness on the rest.
pub(crate) fn prices(
    items: &[Value],
    tz: Tz,
    policy: &PricePolicy,
    now: DateTime<Utc>,
) -> (Vec<Price>, PriceIngest) {
    let mut stats = PriceIngest::default();
    let mut out = Vec::with_capacity(items.len());
    for (idx, raw) in items.iter().enumerate() {
        let item = match PriceItem::deserialize(raw) {
            Ok(item) => item,
            Err(e) => {
                warn!(index = idx, error = %e, "malformed price skipped");
                stats.malformed += 1;
                continue;
            }
        };
        let updated = match timestamp::parse(&item.lastupdated, tz) {
            Ok(t) => t,
            Err(e) => {
                warn!(station = %item.stationcode, fueltype = %item.fueltype, error = %e, "price skipped");
                stats.undated += 1;
                continue;
            }
        };
        let price = Price::new(
            item.stationcode.clone(),
            item.fueltype.clone(),
            item.price,
            updated.timestamp(),
        );
        if is_expired(&price, policy, now) {
            stats.expired += 1;
            continue;
        }
        out.push(price);
    }
    annotate_staleness(&mut out, policy, now);
    stats.kept = out.len();
    (out, stats)
}
