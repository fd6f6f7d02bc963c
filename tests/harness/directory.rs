//! Naming Directory Tests
//!
//! Bind/rebind/lookup contracts, the reserved type-keyed namespace and
//! concurrent access from several contexts.

use crate::*;
use std::thread;
use txharness::{CompositeName, NameParser};

// =============================================================================
// NAMED BINDINGS
// =============================================================================

#[test]
fn test_duplicate_bind_fails() {
    let directory = Directory::new();
    directory.bind("a/b", Arc::new(1u32)).unwrap();

    let err = directory.bind("a/b", Arc::new(2u32)).unwrap_err();
    assert!(err.is_already_bound());
    assert_eq!(*directory.lookup_as::<_, u32>("a/b").unwrap(), 1);
}

#[test]
fn test_rebind_never_fails() {
    let directory = Directory::new();
    directory.rebind("a/b", Arc::new(1u32)).unwrap();
    directory.rebind("a/b", Arc::new("replaced")).unwrap();
    assert_eq!(*directory.lookup_as::<_, &str>("a/b").unwrap(), "replaced");
}

#[test]
fn test_lookup_of_unbound_name_fails() {
    let directory = Directory::new();
    let err = directory.lookup("missing/name").unwrap_err();
    assert!(err.is_not_found());

    let err: txharness::Error = err.into();
    assert!(err.is_not_found());
}

#[test]
fn test_leading_separator_is_ignored() {
    let directory = Directory::new();
    directory.bind("/jdbc/orders", Arc::new(7u8)).unwrap();
    assert!(directory.contains("jdbc/orders"));
    assert!(directory.lookup("/jdbc/orders").is_ok());
}

#[test]
fn test_rename_moves_binding() {
    let directory = Directory::new();
    directory.bind("old", Arc::new(3i64)).unwrap();
    directory.rename("old", "new").unwrap();
    assert!(!directory.contains("old"));
    assert_eq!(*directory.lookup_as::<_, i64>("new").unwrap(), 3);
    assert!(directory.rename("old", "other").unwrap_err().is_not_found());
}

#[test]
fn test_list_matches_children_only() {
    let directory = Directory::new();
    directory.bind("env/a", Arc::new(1u32)).unwrap();
    directory.bind("env/b", Arc::new(2u32)).unwrap();
    directory.bind("envelope", Arc::new(3u32)).unwrap();

    let mut names: Vec<String> = directory.list("env").into_iter().map(|p| p.name).collect();
    names.sort();
    assert_eq!(names, vec!["env/a", "env/b"]);

    let total: u32 = directory
        .list_bindings("env")
        .iter()
        .filter_map(|b| b.object_as::<u32>())
        .map(|v| *v)
        .sum();
    assert_eq!(total, 3);
}

#[test]
fn test_composite_names_address_the_same_binding() {
    let directory = Directory::new();
    let parser = NameParser::new("java:comp");
    let name = parser.parse("env/limit");
    directory.bind(&name, Arc::new(10u32)).unwrap();

    let composed = directory.compose_name(
        &CompositeName::parse("limit"),
        &CompositeName::parse("java:comp/env"),
    );
    assert_eq!(composed.to_string(), "java:comp/env/limit");
    assert_eq!(*directory.lookup_as::<_, u32>(&composed).unwrap(), 10);
}

// =============================================================================
// TYPE-KEYED REGISTRATIONS
// =============================================================================

#[derive(Debug, PartialEq)]
struct Clock(u64);

#[test]
fn test_clear_removes_only_reserved_entries() {
    let directory = Directory::new();
    directory.bind("a/b", Arc::new(1u32)).unwrap();
    directory.put(Arc::new(Clock(42)));
    assert_eq!(directory.get::<Clock>().unwrap().0, 42);

    assert_eq!(directory.clear(), 1);
    assert!(directory.get::<Clock>().is_none());
    assert!(directory.lookup("a/b").is_ok());
}

#[test]
fn test_harness_reset_clears_type_registry() {
    let harness = create_harness();
    harness.directory().put(Arc::new(Clock(1)));
    harness.transaction_manager().unwrap();

    assert_eq!(harness.reset(), 1);
    assert!(!harness.directory().contains_type::<Clock>());
    assert!(harness
        .directory()
        .contains(txharness::registry::TRANSACTION_MANAGER_NAME));
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_concurrent_bind_has_one_winner() {
    let directory = Arc::new(Directory::new());
    let handles: Vec<_> = (0..8u32)
        .map(|i| {
            let directory = Arc::clone(&directory);
            thread::spawn(move || directory.bind("contended", Arc::new(i)).is_ok())
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert!(directory.lookup("contended").is_ok());
}

#[test]
fn test_concurrent_binds_to_distinct_names() {
    let directory = Arc::new(Directory::new());
    let handles: Vec<_> = (0..8u32)
        .map(|i| {
            let directory = Arc::clone(&directory);
            thread::spawn(move || {
                for j in 0..50u32 {
                    directory
                        .bind(&format!("worker/{}/{}", i, j), Arc::new(j))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(directory.list("worker").len(), 400);
}
