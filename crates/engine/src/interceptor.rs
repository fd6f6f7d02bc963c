//! Transactional wrapper
//!
//! [`Transactional`] decorates a target so every call made through
//! [`invoke`](Transactional::invoke) is transaction-scoped. Calls made from
//! inside another invocation on the same context join its transaction; only
//! the outermost call ends it.
//!
//! ```ignore
//! let orders = harness.wrap(OrderService::new())?;
//! let ctx = harness.new_context();
//! orders.invoke(&ctx, |svc| svc.place(order))?;
//! ```

use crate::classify::{DeclaredRollback, RollbackClassifier};
use crate::error::InvocationError;
use crate::policy::TransactionPolicy;
use std::fmt;
use txharness_concurrency::ExecutionContext;

/// A target whose calls run inside transactions
pub struct Transactional<T, C = DeclaredRollback> {
    target: T,
    policy: TransactionPolicy,
    classifier: C,
}

impl<T> Transactional<T> {
    /// Wrap `target`, classifying failures by their declared rollback behavior
    pub fn new(target: T, policy: TransactionPolicy) -> Self {
        Self {
            target,
            policy,
            classifier: DeclaredRollback,
        }
    }
}

impl<T, C> Transactional<T, C> {
    /// Replace the failure classifier
    pub fn with_classifier<D>(self, classifier: D) -> Transactional<T, D> {
        Transactional {
            target: self.target,
            policy: self.policy,
            classifier,
        }
    }

    /// The wrapped target, bypassing transaction demarcation
    pub fn target(&self) -> &T {
        &self.target
    }

    /// The policy used for every call
    pub fn policy(&self) -> &TransactionPolicy {
        &self.policy
    }

    /// Unwrap the target
    pub fn into_inner(self) -> T {
        self.target
    }

    /// Call `operation` on the target inside a transaction on `ctx`
    pub fn invoke<R, E, F>(
        &self,
        ctx: &ExecutionContext,
        operation: F,
    ) -> Result<R, InvocationError<E>>
    where
        C: RollbackClassifier<E>,
        F: FnOnce(&T) -> Result<R, E>,
    {
        self.policy
            .run(ctx, &self.classifier, || operation(&self.target))
    }
}

impl<T: fmt::Debug, C> fmt::Debug for Transactional<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transactional")
            .field("target", &self.target)
            .field("policy", &self.policy)
            .finish()
    }
}
