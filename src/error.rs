//! Unified error types for txharness.
//!
//! This module provides a single error type covering the directory, the
//! coordinator and configuration loading.

use thiserror::Error;
use txharness_core::{ResourceError, ResourceOperation, Xid};
use txharness_engine::{ApplicationError, ConfigError};

/// All txharness errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A binding already exists under the name
    #[error("name already bound: {0}")]
    NameAlreadyBound(String),

    /// Nothing is bound under the name
    #[error("name not found: {0}")]
    NameNotFound(String),

    /// The name cannot be used
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The bound object is not of the requested type
    #[error("wrong type for '{name}': expected {expected}, got {actual}")]
    WrongType {
        /// Name looked up
        name: String,
        /// Requested type
        expected: String,
        /// Type actually bound
        actual: String,
    },

    /// The operation is not legal in the current transaction state
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A participant failed during the commit or rollback protocol
    #[error("resource {operation} failed in transaction {xid}: {source}")]
    Resource {
        /// Protocol step that failed
        operation: ResourceOperation,
        /// Transaction being completed
        xid: Xid,
        /// Participant's failure
        #[source]
        source: ResourceError,
    },

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for txharness operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NameNotFound(_))
    }

    /// Check if this is an already-bound error.
    pub fn is_already_bound(&self) -> bool {
        matches!(self, Error::NameAlreadyBound(_))
    }

    /// Check if this is an illegal-state error.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState(_))
    }

    /// Check if a participant failed.
    pub fn is_resource_failure(&self) -> bool {
        matches!(self, Error::Resource { .. })
    }
}

// Harness failures inside wrapped calls always roll back
impl ApplicationError for Error {}

// Convert from core errors
impl From<txharness_core::Error> for Error {
    fn from(e: txharness_core::Error) -> Self {
        use txharness_core::Error as CoreError;
        match e {
            CoreError::NameAlreadyBound { name } => Error::NameAlreadyBound(name),
            CoreError::NameNotFound { name } => Error::NameNotFound(name),
            CoreError::InvalidName { name, reason } => {
                Error::InvalidName(format!("'{}': {}", name, reason))
            }
            CoreError::WrongType {
                name,
                expected,
                actual,
            } => Error::WrongType {
                name,
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
            CoreError::IllegalState { reason } => Error::IllegalState(reason),
            CoreError::ResourceOperation {
                operation,
                xid,
                source,
            } => Error::Resource {
                operation,
                xid,
                source,
            },
        }
    }
}
