//! # txharness
//!
//! In-process emulation of a container-managed transaction environment.
//!
//! Application code written against a managed-resource programming model
//! runs unchanged in plain tests: a naming directory locates the shared
//! coordinator, the coordinator drives enlisted participants through the
//! commit and rollback protocols, and a wrapper begins, commits or rolls
//! back transactions around every call.
//!
//! ## Quick Start
//!
//! ```ignore
//! use txharness::prelude::*;
//!
//! let harness = Harness::new()?;
//! let accounts = harness.wrap(AccountService::default())?;
//!
//! // One context per logical thread of work
//! let ctx = harness.new_context();
//! accounts.invoke(&ctx, |svc| svc.transfer(from, to, 100))?;
//! ```
//!
//! ## Layers
//!
//! - [`Directory`] - Thread-safe name and type registry
//! - [`TransactionManager`] - Per-context transaction stacks and the completion protocol
//! - [`Transactional`] / [`TransactionPolicy`] - Transaction-scoped invocation
//! - [`Harness`] - Root context wiring the layers together
//!
//! ## Ownership
//!
//! The call that begins a transaction is the one that ends it. Nested calls
//! that fail only mark the transaction rollback-only; the owning call rolls
//! it back when it returns.

#![warn(missing_docs)]

mod error;
mod harness;

pub mod prelude;

// Re-export main entry points
pub use error::{Error, Result};
pub use harness::{Harness, HarnessBuilder};

// Re-export the layers
pub use txharness_concurrency::{
    ContextId, CoordinatorMetrics, ExecutionContext, Transaction, TransactionManager,
};
pub use txharness_core::{
    Resource, ResourceError, ResourceOperation, ResourceResult, Status, Synchronization, Xid,
};
pub use txharness_engine::registry;
pub use txharness_engine::{
    AlwaysRollback, ApplicationError, ConfigError, DeclaredRollback, HarnessConfig,
    InvocationError, LocalTransaction, PersistenceUnit, ResourceLocalTransaction,
    RollbackClassifier, TransactionMode, TransactionPolicy, Transactional,
};
pub use txharness_naming::{Binding, CompositeName, Directory, NameClassPair, NameParser};
