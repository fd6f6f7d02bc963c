//! Transaction coordination for txharness
//!
//! This crate emulates a container transaction manager in-process:
//! - [`Transaction`]: status machine, enlisted participants, completion listeners
//! - [`ExecutionContext`]: explicit per-context LIFO stack of transactions
//! - [`TransactionManager`]: begin/commit/rollback/suspend/resume over a context
//!
//! Contexts never share a stack. The manager itself is shared and holds only
//! the token generator, the configured timeout and metrics.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod manager;
pub mod transaction;

pub use context::{ContextId, ExecutionContext};
pub use manager::{CoordinatorMetrics, TransactionManager};
pub use transaction::Transaction;
