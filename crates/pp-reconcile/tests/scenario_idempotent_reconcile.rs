use pp_reconcile::*;
use pp_schemas::{Brand, Entity, Fueltype};

#[test]
fn scenario_reconciling_a_snapshot_against_itself_writes_nothing() {
    let snapshot = vec![
        Brand::new("Shell", 0),
        Brand::new("Caltex", 1),
        Brand::new("Caltex", 1),
        Brand::new("BP", 2),
    ];

    let d = reconcile(&snapshot, &snapshot);

    assert!(d.to_enable.is_empty());
    assert!(d.to_disable.is_empty());
    assert!(d.is_noop());
    assert_eq!(d.unchanged, snapshot);
}

#[test]
fn scenario_empty_inputs_degrade_to_the_other_side() {
    let up = vec![Fueltype::new("E10", "Ethanol 94", 0)];

    let only_upstream = reconcile(&up, &[]);
    assert_eq!(only_upstream.to_enable, up);
    assert!(only_upstream.to_disable.is_empty());

    let only_stored = reconcile(&[], &up);
    assert!(only_stored.to_enable.is_empty());
    assert_eq!(only_stored.to_disable, vec![up[0].deactivated()]);

    let nothing = reconcile::<Fueltype>(&[], &[]);
    assert!(nothing.is_noop());
}
