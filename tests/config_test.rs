//! Layered configuration: defaults, TOML file, then environment overrides

use crabcaps::config::CapsConfig;

#[test]
fn test_environment_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crabcaps.toml");
    std::fs::write(
        &path,
        "[remote]\ncollection_root = \"Reports\"\nnode_marker = \"Entries\"\nrepopulate_interval_secs = 10\nallow_duplicate_uploads = false\nstore_directory = \"/tmp/reports\"\n",
    )
    .unwrap();

    std::env::set_var("CRABCAPS__REMOTE__ALLOW_DUPLICATE_UPLOADS", "true");
    std::env::set_var("CRABCAPS__AGGREGATOR__AR_POLL_TIMEOUT_MS", "0");
    let config = CapsConfig::load_layered(&path);
    std::env::remove_var("CRABCAPS__REMOTE__ALLOW_DUPLICATE_UPLOADS");
    std::env::remove_var("CRABCAPS__AGGREGATOR__AR_POLL_TIMEOUT_MS");

    let config = config.unwrap();
    assert_eq!(config.remote.collection_root, "Reports");
    assert_eq!(config.remote.repopulate_interval_secs, 10);
    assert!(config.remote.allow_duplicate_uploads);
    assert_eq!(config.aggregator.ar_poll_timeout(), None);
    assert_eq!(config.aggregator.ar_poll_interval_ms, 200);
}

#[test]
fn test_layered_rejects_invalid_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[aggregator]\nar_poll_interval_ms = 0\n").unwrap();

    let err = CapsConfig::load_layered(&path).unwrap_err();
    assert!(err.to_string().contains("AR poll interval"));
}
