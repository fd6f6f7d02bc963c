//! Rollback classification
//!
//! When a wrapped operation fails, the transaction is marked rollback-only
//! unless the failure is classified as not requiring rollback. The
//! classification is pluggable:
//!
//! - [`DeclaredRollback`] asks the error itself through [`ApplicationError`]
//! - [`AlwaysRollback`] rolls back on every failure
//! - any `Fn(&E) -> bool` closure returning `true` to suppress rollback

use crate::error::InvocationError;

/// Decides whether a failure leaves the transaction committable
pub trait RollbackClassifier<E: ?Sized> {
    /// Return `true` if `error` must not mark the transaction rollback-only
    fn suppresses_rollback(&self, error: &E) -> bool;
}

/// Errors that declare their own rollback behavior
///
/// The default is to roll back. Override [`rollback`](Self::rollback) for
/// application errors that leave the transaction intact.
pub trait ApplicationError {
    /// Whether this failure requires the transaction to roll back
    fn rollback(&self) -> bool {
        true
    }
}

/// Classifier that defers to [`ApplicationError::rollback`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredRollback;

impl<E: ApplicationError + ?Sized> RollbackClassifier<E> for DeclaredRollback {
    fn suppresses_rollback(&self, error: &E) -> bool {
        !error.rollback()
    }
}

/// Classifier that never suppresses rollback
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRollback;

impl<E: ?Sized> RollbackClassifier<E> for AlwaysRollback {
    fn suppresses_rollback(&self, _error: &E) -> bool {
        false
    }
}

impl<E: ?Sized, F> RollbackClassifier<E> for F
where
    F: Fn(&E) -> bool,
{
    fn suppresses_rollback(&self, error: &E) -> bool {
        self(error)
    }
}

/// A nested invocation's failure keeps the inner error's declaration
impl<E: ApplicationError> ApplicationError for InvocationError<E> {
    fn rollback(&self) -> bool {
        match self {
            InvocationError::Operation(e) => e.rollback(),
            InvocationError::Transaction(_) => true,
        }
    }
}

impl ApplicationError for txharness_core::Error {}
