//! Resource-local transactions
//!
//! When the persistence unit talks to its store directly, transactions are
//! demarcated on the persistence layer itself rather than through the
//! coordinator. [`ResourceLocalTransaction`] is that seam;
//! [`LocalTransaction`] is an in-memory implementation that records what
//! happened to it.

use parking_lot::Mutex;
use txharness_core::{Error, Result};

/// A transaction owned by the persistence layer
pub trait ResourceLocalTransaction: Send + Sync {
    /// Start a transaction. Fails if one is already active.
    fn begin(&self) -> Result<()>;

    /// Commit the active transaction. A rollback-only transaction is rolled
    /// back instead and the commit fails.
    fn commit(&self) -> Result<()>;

    /// Roll back the active transaction
    fn rollback(&self) -> Result<()>;

    /// Mark the active transaction so it can only roll back
    fn set_rollback_only(&self) -> Result<()>;

    /// Check if the active transaction is marked rollback-only
    fn rollback_only(&self) -> bool;

    /// Check if a transaction is active
    fn is_active(&self) -> bool;
}

#[derive(Debug, Default)]
struct LocalState {
    active: bool,
    rollback_only: bool,
    commits: u64,
    rollbacks: u64,
}

/// In-memory resource-local transaction
#[derive(Debug, Default)]
pub struct LocalTransaction {
    state: Mutex<LocalState>,
}

impl LocalTransaction {
    /// Create an inactive transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful commits
    pub fn commit_count(&self) -> u64 {
        self.state.lock().commits
    }

    /// Number of rollbacks, including those forced by a rollback-only commit
    pub fn rollback_count(&self) -> u64 {
        self.state.lock().rollbacks
    }

    fn require_active(state: &LocalState, operation: &str) -> Result<()> {
        if state.active {
            Ok(())
        } else {
            Err(Error::illegal_state(format!(
                "{} called with no active transaction",
                operation
            )))
        }
    }
}

impl ResourceLocalTransaction for LocalTransaction {
    fn begin(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.active {
            return Err(Error::illegal_state("Transaction already active"));
        }
        state.active = true;
        state.rollback_only = false;
        tracing::debug!("local transaction begun");
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut state = self.state.lock();
        Self::require_active(&state, "commit")?;
        state.active = false;
        if state.rollback_only {
            state.rollback_only = false;
            state.rollbacks += 1;
            tracing::debug!("local transaction marked rollback-only, rolled back on commit");
            return Err(Error::illegal_state("Rollback only"));
        }
        state.commits += 1;
        tracing::debug!("local transaction committed");
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock();
        Self::require_active(&state, "rollback")?;
        state.active = false;
        state.rollback_only = false;
        state.rollbacks += 1;
        tracing::debug!("local transaction rolled back");
        Ok(())
    }

    fn set_rollback_only(&self) -> Result<()> {
        let mut state = self.state.lock();
        Self::require_active(&state, "setRollbackOnly")?;
        state.rollback_only = true;
        Ok(())
    }

    fn rollback_only(&self) -> bool {
        let state = self.state.lock();
        state.active && state.rollback_only
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }
}
