//! Execution contexts
//!
//! An [`ExecutionContext`] is the explicit handle for one logical thread of
//! work (a test, a worker, a request). It owns a LIFO stack of transactions;
//! the top of the stack is the context's current transaction.
//!
//! Cloning the handle shares the same stack. Distinct contexts never share
//! a stack, so the stack lock is uncontended in practice; it exists so the
//! handle can move between threads or cooperative tasks.

use crate::transaction::Transaction;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use txharness_core::Xid;
use uuid::Uuid;

/// Unique identifier for an execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Create a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) struct ContextInner {
    id: ContextId,
    stack: Mutex<Vec<Arc<Transaction>>>,
}

/// Handle to one execution context's transaction stack
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    /// Create a context with an empty stack
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: ContextId::new(),
                stack: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ContextInner>) -> Self {
        Self { inner }
    }

    /// This context's identifier
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// Number of transactions on the stack
    pub fn depth(&self) -> usize {
        self.inner.stack.lock().len()
    }

    /// The current (top-of-stack) transaction
    pub fn current(&self) -> Option<Arc<Transaction>> {
        self.inner.stack.lock().last().cloned()
    }

    /// Snapshot of the stack, current transaction first
    pub fn transactions(&self) -> Vec<Arc<Transaction>> {
        self.inner.stack.lock().iter().rev().cloned().collect()
    }

    /// Check if both handles refer to the same context
    pub fn same_context(&self, other: &ExecutionContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn push(&self, transaction: Arc<Transaction>) {
        transaction.attach(Arc::downgrade(&self.inner));
        self.inner.stack.lock().push(transaction);
    }

    pub(crate) fn pop(&self) -> Option<Arc<Transaction>> {
        let popped = self.inner.stack.lock().pop();
        if let Some(tx) = &popped {
            tx.detach();
        }
        popped
    }

    /// Remove the transaction identified by `xid`, wherever it sits
    pub(crate) fn evict(&self, xid: Xid) -> Option<Arc<Transaction>> {
        let removed = {
            let mut stack = self.inner.stack.lock();
            let position = stack.iter().rposition(|tx| tx.xid() == xid);
            position.map(|index| stack.remove(index))
        };
        if let Some(tx) = &removed {
            tx.detach();
        }
        removed
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.inner.id)
            .field("depth", &self.depth())
            .finish()
    }
}
