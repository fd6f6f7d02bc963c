//! Transaction manager for coordinating transaction boundaries
//!
//! Drives the per-context transaction stack:
//! 1. `begin` pushes a new transaction (discarding a finished one on top)
//! 2. `commit` / `rollback` complete the top transaction
//! 3. The manager's completion listener evicts the finished transaction
//!
//! ## Nested begin
//!
//! `begin` does not reject being called while an active transaction is
//! current: it pushes a second transaction on top of the first. `commit`
//! then completes only the top one and the first stays active on the stack.
//! Callers may depend on this; it is logged at `warn` rather than changed.
//!
//! ## Timeouts
//!
//! The configured timeout is recorded on each transaction at begin. No timer
//! fires; callers enforce timeouts themselves.

use crate::context::ExecutionContext;
use crate::transaction::Transaction;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use txharness_core::{Error, Result, Status, Synchronization, XidGenerator};

/// Coordinates transactions across execution contexts
///
/// One manager is normally shared by every context of a harness; it keeps
/// no per-context state itself.
#[derive(Debug, Default)]
pub struct TransactionManager {
    /// Token allocation, monotonic across all contexts
    xids: XidGenerator,

    /// Timeout in seconds recorded on new transactions (0 = none)
    timeout_secs: AtomicU32,

    metrics: Arc<MetricsCounters>,
}

impl TransactionManager {
    /// Create a manager with no timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager whose first transaction token encodes `first_xid`
    pub fn with_first_xid(first_xid: u64) -> Self {
        Self {
            xids: XidGenerator::starting_at(first_xid),
            ..Self::default()
        }
    }

    /// Begin a new transaction on `ctx`
    ///
    /// A finished transaction on top of the stack is discarded first. A new
    /// transaction is always pushed, even if an active one is current.
    pub fn begin(&self, ctx: &ExecutionContext) -> Arc<Transaction> {
        if let Some(top) = ctx.current() {
            if top.is_finished() {
                tracing::debug!(context = %ctx.id(), xid = %top.xid(), "discard old tx");
                ctx.pop();
            } else {
                tracing::warn!(
                    context = %ctx.id(),
                    xid = %top.xid(),
                    "begin called with an active transaction; nesting a new one on top"
                );
            }
        }

        let tx = Arc::new(Transaction::new(
            self.xids.next_xid(),
            self.transaction_timeout(),
        ));
        tx.push_synchronization(Arc::new(StackEviction {
            transaction: Arc::downgrade(&tx),
            metrics: self.metrics.clone(),
        }));
        ctx.push(tx.clone());
        self.metrics.begun.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(context = %ctx.id(), xid = %tx.xid(), depth = ctx.depth(), "begin");
        tx
    }

    /// Commit the current transaction of `ctx`
    pub fn commit(&self, ctx: &ExecutionContext) -> Result<()> {
        let tx = Self::require_current(ctx, "commit")?;
        tracing::debug!(context = %ctx.id(), xid = %tx.xid(), "commit");
        tx.commit()
    }

    /// Roll back the current transaction of `ctx`
    pub fn rollback(&self, ctx: &ExecutionContext) -> Result<()> {
        let tx = Self::require_current(ctx, "rollback")?;
        tracing::debug!(context = %ctx.id(), xid = %tx.xid(), "rollback");
        tx.rollback()
    }

    /// Mark the current transaction of `ctx` rollback-only
    pub fn set_rollback_only(&self, ctx: &ExecutionContext) -> Result<()> {
        let tx = Self::require_current(ctx, "setRollbackOnly")?;
        tracing::debug!(context = %ctx.id(), xid = %tx.xid(), "setRollbackOnly");
        tx.set_rollback_only()
    }

    /// Detach the current transaction from `ctx` without changing its status
    pub fn suspend(&self, ctx: &ExecutionContext) -> Option<Arc<Transaction>> {
        let tx = ctx.pop();
        match &tx {
            Some(tx) => tracing::debug!(context = %ctx.id(), xid = %tx.xid(), "suspend"),
            None => tracing::debug!(context = %ctx.id(), "suspend with no transaction"),
        }
        tx
    }

    /// Make `tx` the current transaction of `ctx`
    ///
    /// Only a suspended transaction can be resumed. Fails with
    /// `IllegalState` if `tx` is still on a context's stack or if `ctx`
    /// already has a current transaction.
    pub fn resume(&self, ctx: &ExecutionContext, tx: Arc<Transaction>) -> Result<()> {
        tracing::debug!(context = %ctx.id(), xid = %tx.xid(), "resume");
        if let Some(holder) = tx.attached_context() {
            return Err(Error::illegal_state(format!(
                "transaction {} is not suspended; context {} holds it",
                tx.xid(),
                holder.id()
            )));
        }
        if let Some(current) = ctx.current() {
            return Err(Error::illegal_state(format!(
                "Already in transaction {}",
                current.xid()
            )));
        }
        ctx.push(tx);
        Ok(())
    }

    /// Status of the current transaction, or `NoTransaction`
    pub fn status(&self, ctx: &ExecutionContext) -> Status {
        let status = ctx
            .current()
            .map(|tx| tx.status())
            .unwrap_or(Status::NoTransaction);
        tracing::trace!(context = %ctx.id(), %status, "getStatus");
        status
    }

    /// The current transaction of `ctx`
    pub fn transaction(&self, ctx: &ExecutionContext) -> Option<Arc<Transaction>> {
        let tx = ctx.current();
        tracing::trace!(context = %ctx.id(), xid = ?tx.as_ref().map(|t| t.xid()), "getTransaction");
        tx
    }

    /// Set the timeout recorded on transactions begun from now on
    ///
    /// `0` restores the default (no timeout).
    pub fn set_transaction_timeout(&self, seconds: u32) {
        tracing::debug!(seconds, "setTransactionTimeout");
        self.timeout_secs.store(seconds, Ordering::SeqCst);
    }

    /// The configured timeout
    pub fn transaction_timeout(&self) -> Option<Duration> {
        match self.timeout_secs.load(Ordering::SeqCst) {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        }
    }

    /// Snapshot of completion counters
    pub fn metrics(&self) -> CoordinatorMetrics {
        self.metrics.snapshot()
    }

    fn require_current(ctx: &ExecutionContext, operation: &str) -> Result<Arc<Transaction>> {
        ctx.current().ok_or_else(|| {
            tracing::debug!(context = %ctx.id(), operation, "no transaction");
            Error::illegal_state("No transaction")
        })
    }
}

/// The manager's completion listener, registered first on every transaction
///
/// Evicts the finished transaction from whichever context currently holds
/// it, so the stack cleans itself up however completion was reached.
struct StackEviction {
    transaction: Weak<Transaction>,
    metrics: Arc<MetricsCounters>,
}

impl Synchronization for StackEviction {
    fn before_completion(&self) {}

    fn after_completion(&self, status: Status) {
        match status {
            Status::Committed => self.metrics.committed.fetch_add(1, Ordering::Relaxed),
            Status::Unknown => self.metrics.unknown.fetch_add(1, Ordering::Relaxed),
            _ => self.metrics.rolled_back.fetch_add(1, Ordering::Relaxed),
        };

        let Some(tx) = self.transaction.upgrade() else {
            return;
        };
        if let Some(ctx) = tx.attached_context() {
            if ctx.evict(tx.xid()).is_some() {
                tracing::debug!(context = %ctx.id(), xid = %tx.xid(), %status, "evicted completed transaction");
            }
        }
    }
}

#[derive(Debug, Default)]
struct MetricsCounters {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    unknown: AtomicU64,
}

impl MetricsCounters {
    fn snapshot(&self) -> CoordinatorMetrics {
        let total_begun = self.begun.load(Ordering::Relaxed);
        let total_committed = self.committed.load(Ordering::Relaxed);
        let total_rolled_back = self.rolled_back.load(Ordering::Relaxed);
        let total_unknown = self.unknown.load(Ordering::Relaxed);
        let completed = total_committed + total_rolled_back + total_unknown;
        CoordinatorMetrics {
            total_begun,
            total_committed,
            total_rolled_back,
            total_unknown,
            active_count: total_begun.saturating_sub(completed),
            commit_rate: if completed == 0 {
                0.0
            } else {
                total_committed as f64 / completed as f64
            },
        }
    }
}

/// Coordinator counters
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorMetrics {
    /// Transactions begun
    pub total_begun: u64,
    /// Transactions committed
    pub total_committed: u64,
    /// Transactions rolled back
    pub total_rolled_back: u64,
    /// Transactions whose commit step failed part-way
    pub total_unknown: u64,
    /// Begun but not completed (includes suspended and stuck transactions)
    pub active_count: u64,
    /// Committed / completed (0.0 - 1.0)
    pub commit_rate: f64,
}
