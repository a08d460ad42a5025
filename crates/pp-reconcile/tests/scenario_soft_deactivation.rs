use pp_reconcile::*;
use pp_schemas::Brand;
use serde_json::json;

#[test]
fn scenario_deactivation_preserves_every_other_field() {
    let stored = vec![Brand::new("Shell", 3)];

    let d = reconcile(&[], &stored);

    assert_eq!(d.to_disable.len(), 1);
    assert_eq!(
        serde_json::to_value(&d.to_disable[0]).unwrap(),
        json!({"name": "Shell", "active": false, "order": 3})
    );
}

#[test]
fn scenario_shell_replaces_caltex() {
    let upstream = vec![Brand::new("Shell", 0)];
    let stored = vec![Brand::new("Caltex", 0)];

    let d = reconcile(&upstream, &stored);

    assert_eq!(d.to_enable, vec![Brand::new("Shell", 0)]);
    let mut caltex = Brand::new("Caltex", 0);
    caltex.active = false;
    assert_eq!(d.to_disable, vec![caltex]);
    assert!(d.unchanged.is_empty());

    // Both documents survive in the resulting collection.
    assert_eq!(d.resulting_documents().len(), 2);
}
