//! Single-measure helpers. Each returns `None` for empty input.

use std::collections::BTreeMap;

use pp_schemas::Price;

/// Histogram of floor(price) -> count.
pub fn distribution(values: &[f64]) -> BTreeMap<i64, usize> {
    let mut out = BTreeMap::new();
    for v in values {
        *out.entry(v.floor() as i64).or_default() += 1;
    }
    out
}

/// Cheapest price; the first one wins a tie.
pub fn min_by_price<'a>(prices: &[&'a Price]) -> Option<&'a Price> {
    let mut best: Option<&'a Price> = None;
    for p in prices {
        match best {
            Some(b) if p.price >= b.price => {}
            _ => best = Some(p),
        }
    }
    best
}

/// Dearest price; the first one wins a tie.
pub fn max_by_price<'a>(prices: &[&'a Price]) -> Option<&'a Price> {
    let mut best: Option<&'a Price> = None;
    for p in prices {
        match best {
            Some(b) if p.price <= b.price => {}
            _ => best = Some(p),
        }
    }
    best
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Middle of the sorted values; mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

/// Sample standard deviation (Welford, n - 1 denominator).
///
/// `None` for no values; `0.0` for a single value.
pub fn stdev(values: &[f64]) -> Option<f64> {
    match values.len() {
        0 => None,
        1 => Some(0.0),
        n => {
            let mut mean = 0.0;
            let mut m2 = 0.0;
            for (i, &x) in values.iter().enumerate() {
                let prev = mean;
                mean += (x - mean) / (i + 1) as f64;
                m2 += (x - mean) * (x - prev);
            }
            Some((m2 / (n - 1) as f64).sqrt())
        }
    }
}
