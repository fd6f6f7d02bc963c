//! Transactional Wrapper Tests
//!
//! Ownership, rollback classification and finalization of wrapped calls,
//! in managed and resource-local modes.

use crate::*;
use txharness::{AlwaysRollback, LocalTransaction, ResourceLocalTransaction};

#[derive(Debug, PartialEq)]
enum LedgerError {
    /// Business rule violation; the transaction stays committable
    Rejected,
    /// Anything else
    Broken,
}

impl ApplicationError for LedgerError {
    fn rollback(&self) -> bool {
        !matches!(self, LedgerError::Rejected)
    }
}

#[derive(Default)]
struct Ledger {
    entries: Mutex<Vec<i64>>,
}

impl Ledger {
    fn post(&self, amount: i64) -> std::result::Result<usize, LedgerError> {
        match amount {
            0 => Err(LedgerError::Rejected),
            i64::MIN..=-1000 => Err(LedgerError::Broken),
            _ => {
                let mut entries = self.entries.lock();
                entries.push(amount);
                Ok(entries.len())
            }
        }
    }

    fn balance(&self) -> std::result::Result<i64, LedgerError> {
        Ok(self.entries.lock().iter().sum())
    }
}

fn managed_harness(journal: &Journal) -> Harness {
    init_tracing();
    Harness::builder()
        .connection(Participant::new("db", journal))
        .build()
        .unwrap()
}

// =============================================================================
// OWNERSHIP
// =============================================================================

#[test]
fn test_successful_call_commits() {
    let journal = Journal::new();
    let harness = managed_harness(&journal);
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    assert_eq!(ledger.invoke(&ctx, |l| l.post(10)).unwrap(), 1);
    assert_eq!(
        journal.events_of("db"),
        vec!["start", "end", "prepare", "commit"]
    );
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn test_call_joins_existing_transaction() {
    let journal = Journal::new();
    let harness = managed_harness(&journal);
    let tm = harness.transaction_manager().unwrap();
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    let tx = tm.begin(&ctx);
    ledger.invoke(&ctx, |l| l.post(10)).unwrap();
    assert_eq!(tx.status(), Status::Active);
    assert!(journal.events().is_empty());

    tm.commit(&ctx).unwrap();
    assert_eq!(tm.metrics().total_begun, 1);
}

#[test]
fn test_nested_failure_marks_and_owner_rolls_back() {
    let journal = Journal::new();
    let harness = managed_harness(&journal);
    let tm = harness.transaction_manager().unwrap();
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    let outer = ledger.invoke(&ctx, |l| {
        let inner = ledger.invoke(&ctx, |l| l.post(-5000));
        assert_eq!(inner.unwrap_err().into_operation(), Some(LedgerError::Broken));

        // still rollback-only after the nested call returned
        assert_eq!(tm.status(&ctx), Status::MarkedRollback);
        l.post(5)
    });

    assert_eq!(outer.unwrap(), 1);
    assert_eq!(
        journal.events_of("db"),
        vec!["start", "end", "rollback"]
    );
    let metrics = tm.metrics();
    assert_eq!(metrics.total_begun, 1);
    assert_eq!(metrics.total_rolled_back, 1);
    assert_eq!(metrics.total_committed, 0);
}

#[test]
fn test_nested_failure_propagated_by_owner() {
    let journal = Journal::new();
    let harness = managed_harness(&journal);
    let tm = harness.transaction_manager().unwrap();
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    let outer = ledger.invoke(&ctx, |_| -> std::result::Result<(), InvocationError<LedgerError>> {
        ledger.invoke(&ctx, |l| l.post(-5000))?;
        Ok(())
    });

    let err = outer.unwrap_err();
    assert_eq!(err.into_operation().and_then(|e| e.into_operation()), Some(LedgerError::Broken));
    assert_eq!(tm.metrics().total_rolled_back, 1);
    assert_eq!(ctx.depth(), 0);
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

#[test]
fn test_no_rollback_failure_still_commits() {
    let journal = Journal::new();
    let harness = managed_harness(&journal);
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    let err = ledger.invoke(&ctx, |l| l.post(0)).unwrap_err();
    assert_eq!(err.into_operation(), Some(LedgerError::Rejected));
    assert_eq!(journal.events_of("db").last().map(String::as_str), Some("commit"));
}

#[test]
fn test_rolling_back_failure_is_returned_unchanged() {
    let journal = Journal::new();
    let harness = managed_harness(&journal);
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    let err = ledger.invoke(&ctx, |l| l.post(-1000)).unwrap_err();
    assert_eq!(err.into_operation(), Some(LedgerError::Broken));
    assert_eq!(journal.events_of("db").last().map(String::as_str), Some("rollback"));
}

#[test]
fn test_caller_supplied_classifier() {
    let journal = Journal::new();
    let harness = managed_harness(&journal);
    let ctx = harness.new_context();

    let strict = harness
        .wrap(Ledger::default())
        .unwrap()
        .with_classifier(AlwaysRollback);
    assert!(strict.invoke(&ctx, |l| l.post(0)).is_err());
    assert_eq!(journal.events_of("db").last().map(String::as_str), Some("rollback"));

    let lenient = harness
        .wrap(Ledger::default())
        .unwrap()
        .with_classifier(|_: &LedgerError| true);
    assert!(lenient.invoke(&ctx, |l| l.post(-5000)).is_err());
    assert_eq!(journal.events_of("db").last().map(String::as_str), Some("commit"));
}

// =============================================================================
// FINALIZATION FAILURES
// =============================================================================

#[test]
fn test_commit_failure_after_success_is_reported() {
    init_tracing();
    let journal = Journal::new();
    let harness = Harness::builder()
        .connection(Participant::failing("db", &journal, ResourceOperation::Commit))
        .build()
        .unwrap();
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    let err = ledger.invoke(&ctx, |l| l.post(1)).unwrap_err();
    let cause = err.transaction().expect("expected a transaction failure");
    assert!(cause.is_resource_failure());
    assert!(cause.to_string().contains("db refused commit"));
    assert_eq!(
        journal.events_of("db"),
        vec!["start", "end", "prepare", "commit"]
    );
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn test_second_participant_commit_failure_leaves_first_committed() {
    let journal = Journal::new();
    let harness = managed_harness(&journal);
    let tm = harness.transaction_manager().unwrap();
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    let err = ledger
        .invoke(&ctx, |l| {
            let tx = tm.transaction(&ctx).expect("wrapped call runs in a transaction");
            tx.enlist_resource(Participant::failing("queue", &journal, ResourceOperation::Commit))
                .expect("enlist queue");
            tx.register_synchronization(Listener::new("audit", &journal))
                .expect("register audit");
            l.post(5)
        })
        .unwrap_err();

    assert!(err.transaction().expect("expected a transaction failure").is_resource_failure());
    assert_eq!(
        journal.events_of("db"),
        vec!["start", "end", "prepare", "commit"]
    );
    assert_eq!(
        journal.events_of("queue"),
        vec!["start", "end", "prepare", "commit"]
    );
    assert_eq!(
        journal.events_of("audit"),
        vec!["before", "after:STATUS_UNKNOWN"]
    );
    assert_eq!(ctx.depth(), 0);
    assert_eq!(tm.metrics().total_unknown, 1);
}

#[test]
fn test_commit_failure_never_masks_operation_failure() {
    init_tracing();
    let journal = Journal::new();
    let harness = Harness::builder()
        .connection(Participant::failing("db", &journal, ResourceOperation::Commit))
        .build()
        .unwrap();
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    let err = ledger.invoke(&ctx, |l| l.post(0)).unwrap_err();
    assert_eq!(err.into_operation(), Some(LedgerError::Rejected));
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn test_panic_rolls_back_before_unwinding() {
    let journal = Journal::new();
    let harness = managed_harness(&journal);
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = ledger.invoke(&ctx, |_| -> std::result::Result<(), LedgerError> {
            panic!("ledger corrupted")
        });
    }));
    assert!(result.is_err());
    assert_eq!(journal.events_of("db"), vec!["start", "end", "rollback"]);
    assert_eq!(ctx.depth(), 0);
}

// =============================================================================
// RESOURCE-LOCAL MODE
// =============================================================================

#[test]
fn test_resource_local_ownership() {
    init_tracing();
    let local = Arc::new(LocalTransaction::new());
    let harness = Harness::builder()
        .config(HarnessConfig::default().with_connection_url("jdbc:h2:mem:ledger"))
        .local_transaction(local.clone())
        .build()
        .unwrap();
    let ledger = harness.wrap(Ledger::default()).unwrap();
    let ctx = harness.new_context();

    ledger.invoke(&ctx, |l| l.post(10)).unwrap();
    assert_eq!(local.commit_count(), 1);

    let outer = ledger.invoke(&ctx, |l| {
        assert!(local.is_active());
        let _ = ledger.invoke(&ctx, |l| l.post(-5000));
        assert!(local.rollback_only());
        l.balance()
    });
    assert_eq!(outer.unwrap(), 10);
    assert_eq!(local.rollback_count(), 1);
    assert!(!local.is_active());
    assert_eq!(harness.metrics().unwrap().total_begun, 0);
}
