use std::fs;

use pp_config::load_layered_yaml;

#[test]
fn files_are_layered_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let local = dir.path().join("local.yaml");
    fs::write(&base, "prices:\n  stale_after_days: 3\n  expire_after_days: 30\n").unwrap();
    fs::write(&local, "prices:\n  expire_after_days: 14\n").unwrap();

    let base_s = base.to_string_lossy().to_string();
    let local_s = local.to_string_lossy().to_string();
    let loaded = load_layered_yaml(&[base_s.as_str(), local_s.as_str()]).unwrap();

    let s = loaded.settings().unwrap();
    assert_eq!(s.prices.stale_after_days, 3);
    assert_eq!(s.prices.expire_after_days, 14);
}

#[test]
fn missing_file_names_the_path() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}

#[test]
fn empty_layer_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let empty = dir.path().join("empty.yaml");
    fs::write(&base, "sync:\n  dry_run: true\n").unwrap();
    fs::write(&empty, "").unwrap();

    let base_s = base.to_string_lossy().to_string();
    let empty_s = empty.to_string_lossy().to_string();
    let loaded = load_layered_yaml(&[base_s.as_str(), empty_s.as_str()]).unwrap();

    assert!(loaded.settings().unwrap().sync.dry_run);
}
