//! Transactional invocation engine for txharness
//!
//! This crate wires the directory and the coordinator into the surface test
//! code uses:
//! - [`HarnessConfig`]: TOML configuration of the persistence unit
//! - [`PersistenceUnit`] and [`ResourceLocalTransaction`]: the persistence
//!   collaborator, managed or resource-local
//! - [`registry`]: well-known names and lookup-or-create of singletons
//! - [`TransactionPolicy`]: begin/rollback/end decisions around a call
//! - [`Transactional`]: wrapper making every call on a target transaction-scoped
//!
//! # Ownership
//!
//! The call that begins a transaction is the one that ends it. Nested calls
//! only propagate rollback-only flags; the owner commits or rolls back.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod local;
pub mod persistence;
pub mod policy;
pub mod registry;

pub use classify::{AlwaysRollback, ApplicationError, DeclaredRollback, RollbackClassifier};
pub use config::{HarnessConfig, TransactionMode};
pub use error::{ConfigError, InvocationError};
pub use interceptor::Transactional;
pub use local::{LocalTransaction, ResourceLocalTransaction};
pub use persistence::PersistenceUnit;
pub use policy::TransactionPolicy;
