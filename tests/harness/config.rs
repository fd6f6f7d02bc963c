//! Configuration Tests
//!
//! Loading the harness from TOML files and the transaction mode each
//! configuration selects.

use crate::*;
use std::io::Write;
use txharness::{registry, TransactionMode};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_selects_managed_mode() {
    init_tracing();
    let file = write_config(
        r#"
        persistence_unit = "orders"
        jta_data_source = "java:/OrdersDS"
        transaction_timeout_secs = 45
        "#,
    );
    let harness = Harness::builder().config_file(file.path()).build().unwrap();

    assert_eq!(harness.config().persistence_unit, "orders");
    let unit = harness.persistence_unit().unwrap();
    assert_eq!(unit.name(), "orders");
    assert_eq!(unit.mode(), TransactionMode::Managed);

    let tm = harness.transaction_manager().unwrap();
    let ctx = harness.new_context();
    assert_eq!(
        tm.begin(&ctx).timeout(),
        Some(std::time::Duration::from_secs(45))
    );
}

#[test]
fn test_config_file_selects_resource_local_mode() {
    init_tracing();
    let file = write_config(r#"connection_url = "jdbc:h2:mem:orders""#);
    let harness = Harness::builder().config_file(file.path()).build().unwrap();
    let unit = harness.persistence_unit().unwrap();
    assert_eq!(unit.mode(), TransactionMode::ResourceLocal);

    // wrapped calls never touch the coordinator in this mode
    let wrapped = harness.wrap(()).unwrap();
    let ctx = harness.new_context();
    wrapped
        .invoke(&ctx, |_| -> std::result::Result<(), txharness::Error> { Ok(()) })
        .unwrap();
    assert_eq!(harness.metrics().unwrap().total_begun, 0);
}

#[test]
fn test_config_without_connection_is_rejected() {
    let file = write_config(r#"persistence_unit = "orders""#);
    let err = Harness::builder()
        .config_file(file.path())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, txharness::Error::Config(_)));
}

#[test]
fn test_missing_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = Harness::builder()
        .config_file(dir.path().join("absent.toml"))
        .build()
        .err()
        .unwrap();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_shared_directory_shares_singletons() {
    init_tracing();
    let directory = Arc::new(Directory::new());
    let a = Harness::builder()
        .directory(Arc::clone(&directory))
        .build()
        .unwrap();
    let b = Harness::builder()
        .directory(Arc::clone(&directory))
        .build()
        .unwrap();

    assert!(Arc::ptr_eq(
        &a.transaction_manager().unwrap(),
        &b.transaction_manager().unwrap()
    ));
    assert!(!directory.contains(registry::PERSISTENCE_UNIT_NAME));
    a.persistence_unit().unwrap();
    assert!(directory.contains(registry::PERSISTENCE_UNIT_NAME));
}

#[test]
fn test_global_harness_is_shared() {
    let first = Harness::global();
    let second = Harness::global();
    assert!(std::ptr::eq(first, second));
    assert!(Arc::ptr_eq(
        &first.transaction_manager().unwrap(),
        &second.transaction_manager().unwrap()
    ));
}
