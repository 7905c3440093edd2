// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

#[test]
fn empty_document_uses_defaults() {
    let config = BusConfig::from_toml_str("").unwrap();
    assert_eq!(config, BusConfig::default());
    assert_eq!(config.queue_capacity, 10);
    assert_eq!(config.origin, "idbus");
    assert!(config.log_drops);
}

#[test]
fn fields_override_defaults() {
    let config = BusConfig::from_toml_str(
        r#"
        queue_capacity = 64
        origin = "ns"
        log_drops = false
        "#,
    )
    .unwrap();
    assert_eq!(config.queue_capacity, 64);
    assert_eq!(config.origin, "ns");
    assert!(!config.log_drops);
}

#[test]
fn zero_capacity_is_rejected() {
    let err = BusConfig::from_toml_str("queue_capacity = 0").unwrap_err();
    assert!(matches!(err, ConfigError::ZeroCapacity));
}

#[test]
fn empty_origin_is_rejected() {
    let err = BusConfig::from_toml_str("origin = \"\"").unwrap_err();
    assert!(matches!(err, ConfigError::EmptyOrigin));
}

#[test]
fn unknown_fields_are_rejected() {
    let err = BusConfig::from_toml_str("capacity = 5").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn load_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "queue_capacity = 2").unwrap();

    let config = BusConfig::load(file.path()).unwrap();
    assert_eq!(config.queue_capacity, 2);
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    let err = BusConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("missing.toml"));
}
