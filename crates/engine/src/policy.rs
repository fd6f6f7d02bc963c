//! Transaction demarcation around a single call
//!
//! [`TransactionPolicy`] decides, for one invocation, whether to begin a
//! transaction or join the current one, how a failure affects it, and how
//! the owning invocation ends it.
//!
//! ## Invocation Sequence
//!
//! ```text
//! 1. owner = begin_transaction()        begin, or join what is current
//! 2. run the operation
//! 3. on failure (unless suppressed)     rollback_transaction(): mark rollback-only
//! 4. end_transaction(owner)             owner commits, or rolls back if marked
//! 5. return the result, or the operation's own failure
//! ```
//!
//! Only the owner ends a transaction. Nested invocations that fail just mark
//! it rollback-only and the owner acts on the flag.
//!
//! Coordinator failures on the primary path (beginning, or committing after
//! the operation succeeded) are returned. On the failure path they are
//! logged and dropped so the operation's failure is what the caller sees.

use crate::classify::RollbackClassifier;
use crate::error::InvocationError;
use crate::local::ResourceLocalTransaction;
use crate::persistence::PersistenceUnit;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use txharness_concurrency::{ExecutionContext, Transaction, TransactionManager};
use txharness_core::{Result, Status};

/// Begin/rollback/end decisions for transactional invocations
#[derive(Debug, Clone)]
pub struct TransactionPolicy {
    manager: Arc<TransactionManager>,
    unit: Option<Arc<PersistenceUnit>>,
}

impl TransactionPolicy {
    /// Policy driving the coordinator directly
    pub fn new(manager: Arc<TransactionManager>) -> Self {
        Self {
            manager,
            unit: None,
        }
    }

    /// Demarcate through `unit`
    ///
    /// A managed unit joins every transaction this policy begins. A
    /// resource-local unit replaces the coordinator entirely.
    pub fn with_persistence_unit(mut self, unit: Arc<PersistenceUnit>) -> Self {
        self.unit = Some(unit);
        self
    }

    /// The coordinator
    pub fn manager(&self) -> &Arc<TransactionManager> {
        &self.manager
    }

    /// The persistence unit, if any
    pub fn persistence_unit(&self) -> Option<&Arc<PersistenceUnit>> {
        self.unit.as_ref()
    }

    fn local(&self) -> Option<&Arc<dyn ResourceLocalTransaction>> {
        self.unit.as_ref().and_then(|unit| unit.local_transaction())
    }

    /// Begin a transaction unless one is already in progress
    ///
    /// Returns `true` if this call began it and therefore owns it.
    pub fn begin_transaction(&self, ctx: &ExecutionContext) -> Result<bool> {
        if let Some(local) = self.local() {
            if local.is_active() {
                return Ok(false);
            }
            local.begin()?;
            return Ok(true);
        }

        if let Some(current) = self.manager.transaction(ctx) {
            if !current.is_finished() {
                tracing::trace!(context = %ctx.id(), xid = %current.xid(), "joining transaction");
                return Ok(false);
            }
        }

        let tx = self.manager.begin(ctx);
        if let Some(unit) = &self.unit {
            if let Err(e) = unit.join_transaction(&self.manager, ctx) {
                if let Err(cleanup) = tx.rollback() {
                    tracing::warn!(xid = %tx.xid(), error = %cleanup, "rollback after failed join failed");
                }
                return Err(e);
            }
        }
        Ok(true)
    }

    /// Flag the current transaction for rollback
    ///
    /// Best effort: failures are logged and dropped.
    pub fn rollback_transaction(&self, ctx: &ExecutionContext) {
        if let Some(local) = self.local() {
            if local.is_active() && !local.rollback_only() {
                if let Err(e) = local.set_rollback_only() {
                    tracing::warn!(error = %e, "rollback transaction failed");
                }
            }
            return;
        }

        if let Some(tx) = self.manager.transaction(ctx) {
            tracing::debug!(context = %ctx.id(), xid = %tx.xid(), "marking rollback-only");
            if let Err(e) = tx.set_rollback_only() {
                tracing::warn!(xid = %tx.xid(), error = %e, "rollback transaction failed");
            }
        }
    }

    /// End the current transaction if `owner`
    ///
    /// Rolls back a rollback-only transaction and commits anything else. A
    /// commit that failed before its commit step is followed by a
    /// best-effort rollback; either way the commit failure is returned.
    pub fn end_transaction(&self, ctx: &ExecutionContext, owner: bool) -> Result<()> {
        if !owner {
            return Ok(());
        }

        if let Some(local) = self.local() {
            if !local.is_active() {
                return Ok(());
            }
            return if local.rollback_only() {
                local.rollback()
            } else {
                local.commit()
            };
        }

        let Some(tx) = self.manager.transaction(ctx) else {
            tracing::debug!(context = %ctx.id(), "no transaction left to end");
            return Ok(());
        };
        match tx.status() {
            Status::Active => commit_or_rollback(&tx),
            status if status.is_finished() => Ok(()),
            _ => tx.rollback(),
        }
    }

    /// Run `op` inside a transaction
    ///
    /// A failure of `op` marks the transaction rollback-only unless
    /// `classifier` suppresses it; either way the transaction is finalized
    /// before the failure is returned. A panic in `op` is treated as a
    /// failure that requires rollback, then resumed.
    pub fn run<R, E, C, F>(
        &self,
        ctx: &ExecutionContext,
        classifier: &C,
        op: F,
    ) -> std::result::Result<R, InvocationError<E>>
    where
        C: RollbackClassifier<E> + ?Sized,
        F: FnOnce() -> std::result::Result<R, E>,
    {
        let owner = self
            .begin_transaction(ctx)
            .map_err(InvocationError::Transaction)?;

        match panic::catch_unwind(AssertUnwindSafe(op)) {
            Ok(Ok(value)) => {
                self.end_transaction(ctx, owner)
                    .map_err(InvocationError::Transaction)?;
                Ok(value)
            }
            Ok(Err(error)) => {
                if classifier.suppresses_rollback(&error) {
                    tracing::debug!(context = %ctx.id(), "failure does not require rollback");
                } else {
                    self.rollback_transaction(ctx);
                }
                self.end_quietly(ctx, owner);
                Err(InvocationError::Operation(error))
            }
            Err(payload) => {
                tracing::debug!(context = %ctx.id(), "operation panicked");
                self.rollback_transaction(ctx);
                self.end_quietly(ctx, owner);
                panic::resume_unwind(payload)
            }
        }
    }

    fn end_quietly(&self, ctx: &ExecutionContext, owner: bool) {
        if let Err(e) = self.end_transaction(ctx, owner) {
            tracing::warn!(context = %ctx.id(), error = %e, "end transaction failed");
        }
    }
}

fn commit_or_rollback(tx: &Transaction) -> Result<()> {
    let Err(e) = tx.commit() else {
        return Ok(());
    };
    if !tx.is_finished() {
        if let Err(cleanup) = tx.rollback() {
            tracing::warn!(xid = %tx.xid(), error = %cleanup, "rollback after failed commit failed");
        }
    }
    Err(e)
}
