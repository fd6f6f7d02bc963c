//! Convenient imports for txharness.
//!
//! ```ignore
//! use txharness::prelude::*;
//!
//! let harness = Harness::new()?;
//! let ctx = harness.new_context();
//! ```

// Main entry point
pub use crate::harness::{Harness, HarnessBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Coordinator
pub use txharness_concurrency::{ExecutionContext, Transaction, TransactionManager};
pub use txharness_core::{Resource, ResourceError, ResourceResult, Status, Synchronization, Xid};

// Invocation
pub use txharness_engine::{
    ApplicationError, HarnessConfig, InvocationError, RollbackClassifier, TransactionPolicy,
    Transactional,
};

// Directory
pub use txharness_naming::Directory;
