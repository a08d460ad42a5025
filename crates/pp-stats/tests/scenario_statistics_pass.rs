use pp_schemas::Price;
use pp_stats::*;

fn prices(fueltype: &str, values: &[f64]) -> Vec<Price> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Price::new(i.to_string(), fueltype, *v, 1_710_000_000))
        .collect()
}

#[test]
fn scenario_median_of_three_and_two() {
    let mut all = prices("E10", &[1.00, 2.00, 3.00]);
    all.extend(prices("U91", &[1.00, 2.00]));

    let s = compute_statistics(&all, 1_710_000_000);

    assert_eq!(s.buckets["E10"].median, 2.00);
    assert_eq!(s.buckets["U91"].median, 1.50);
}

#[test]
fn scenario_flat_and_single_prices_have_zero_stdev() {
    let mut all = prices("DL", &[10.0, 10.0, 10.0]);
    all.extend(prices("LPG", &[89.9]));

    let s = compute_statistics(&all, 0);

    assert_eq!(s.buckets["DL"].stdev, 0.0);
    assert_eq!(s.buckets["LPG"].stdev, 0.0);
    assert_eq!(s.buckets["LPG"].min, 89.9);
    assert_eq!(s.buckets["LPG"].max, 89.9);
}

#[test]
fn scenario_bad_record_does_not_abort_the_pass() {
    let mut all = prices("P98", &[199.9, 201.9]);
    all.push(Price::new("x", "P98", f64::INFINITY, 0));

    let s = compute_statistics(&all, 0);

    assert_eq!(s.buckets["P98"].count, 2);
    assert!((s.buckets["P98"].mean - 200.9).abs() < 1e-9);
    assert_eq!(
        s.excluded,
        vec![ComputationError::InvalidPrice {
            id: "x".to_string(),
            fueltype: "P98".to_string(),
            price: f64::INFINITY,
        }]
    );
}
