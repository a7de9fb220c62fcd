//! Registry load errors, atomic-write safety, and config loading from disk.

use assert_fs::prelude::*;
use chrono::{TimeZone, Utc};
use importwatch_core::{
    registry::{self, tmp_path_for},
    Config, ConfigError, NewImport, RecordStore, RegistryError, YamlStore,
};
use predicates::prelude::*;
use std::fs;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn missing_registry_opens_empty() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let store = YamlStore::open_at(home.path().join("registry.yaml")).expect("open");
    assert!(store.list().expect("list").is_empty());
}

#[test]
fn corrupt_registry_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("registry.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = YamlStore::open_at(file.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("registry.yaml"), "must contain file path, got: {err}");
}

#[test]
fn wrong_shape_registry_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("registry.yaml");
    file.write_str("- this is a list, not a mapping\n").expect("write");

    let err = YamlStore::open_at(file.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn mid_write_crash_leaves_original_intact() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let path = home.path().join("registry.yaml");
    let mut store = YamlStore::open_at(&path).expect("open");
    store
        .create(NewImport::new("WOH1001.txt", Utc::now()))
        .expect("create");
    let original = fs::read(&path).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = tmp_path_for(&path);
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    assert_eq!(original, fs::read(&path).expect("read after crash"));
    let reopened = YamlStore::open_at(&path).expect("reopen ignores orphan tmp");
    assert_eq!(reopened.list().expect("list").len(), 1);
}

#[test]
fn saved_registry_is_readable_yaml() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let path = home.path().join("registry.yaml");
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    YamlStore::open_at(&path)
        .expect("open")
        .create(NewImport::new("WOH1001.txt", created))
        .expect("create");

    home.child("registry.yaml")
        .assert(predicate::str::contains("file_name: WOH1001.txt"));
    let doc = registry::load_at(&path).expect("load");
    assert_eq!(doc.next_id, 2);
    assert_eq!(doc.records[0].date_created, created);
}

// ---------------------------------------------------------------------------
// 3. Config from disk
// ---------------------------------------------------------------------------

#[test]
fn missing_config_is_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = Config::load_at(&home.path().join("Data").join("Config.json")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
    assert!(err.to_string().contains("Config.json"));
}

#[test]
fn malformed_config_is_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("Config.json");
    file.write_str("{ \"wait_in_seconds\": \"soon\" }").expect("write");
    let err = Config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn valid_config_loads() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("Config.json");
    file.write_str(
        r#"{
            "wait_in_seconds": 15,
            "active_folder": "/in", "error_folder": "/err", "summary_folder": "/sum",
            "email_tos": ["ops@example.com"],
            "default_mail": "smtp",
            "smtp_mail": {"smtp_host": "localhost", "smtp_port": 2525, "email_from": "w@example.com"}
        }"#,
    )
    .expect("write");
    let config = Config::load_at(file.path()).expect("load");
    assert_eq!(config.wait_in_seconds, 15);
    assert_eq!(config.smtp_mail.expect("smtp").smtp_port, 2525);
}
