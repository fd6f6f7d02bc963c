//! Error types shared by the directory and the transaction coordinator
//!
//! ## Taxonomy
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | NameAlreadyBound | `Directory::bind` on an existing name |
//! | NameNotFound | `Directory::lookup` / `rename` on an absent name |
//! | InvalidName | Empty or malformed names |
//! | WrongType | Typed lookup found a value of another type |
//! | IllegalState | No current transaction, resume onto a busy context, illegal status transition |
//! | ResourceOperation | A participant failed during start/end/prepare/commit/rollback |
//!
//! Participant failures are never retried: they surface to the caller of the
//! coordinator operation that triggered them.

use crate::xid::Xid;
use std::fmt;
use thiserror::Error;

/// Result type for harness core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the naming directory and the transaction coordinator
#[derive(Debug, Error)]
pub enum Error {
    /// `bind` was called on a name that is already bound
    #[error("'{name}' is already bound")]
    NameAlreadyBound {
        /// The normalized name
        name: String,
    },

    /// Lookup of a name that is not bound
    #[error("'{name}' is not bound")]
    NameNotFound {
        /// The normalized name
        name: String,
    },

    /// The name cannot be used as a directory key
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// The offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// A typed lookup found a value of a different type
    #[error("'{name}' is bound to a {actual}, not a {expected}")]
    WrongType {
        /// The normalized name
        name: String,
        /// Requested type
        expected: &'static str,
        /// Type recorded at bind time
        actual: &'static str,
    },

    /// Operation is not legal in the current transaction state
    #[error("illegal state: {reason}")]
    IllegalState {
        /// Human-readable reason
        reason: String,
    },

    /// A participant failed while driving the transaction protocol
    #[error("resource {operation} failed for transaction {xid}: {source}")]
    ResourceOperation {
        /// Protocol step that failed
        operation: ResourceOperation,
        /// Transaction the step belonged to
        xid: Xid,
        /// The participant's failure
        #[source]
        source: ResourceError,
    },
}

impl Error {
    /// Shorthand for an [`Error::IllegalState`]
    pub fn illegal_state(reason: impl Into<String>) -> Self {
        Error::IllegalState {
            reason: reason.into(),
        }
    }

    /// Check if this is an illegal-state error
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState { .. })
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NameNotFound { .. })
    }

    /// Check if this is an already-bound error
    pub fn is_already_bound(&self) -> bool {
        matches!(self, Error::NameAlreadyBound { .. })
    }

    /// Check if a participant caused this error
    pub fn is_resource_failure(&self) -> bool {
        matches!(self, Error::ResourceOperation { .. })
    }
}

/// Protocol step a participant was executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceOperation {
    /// Association with a transaction on enlistment
    Start,
    /// Disassociation before completion
    End,
    /// First phase of commit
    Prepare,
    /// Second phase of commit
    Commit,
    /// Rollback
    Rollback,
}

impl fmt::Display for ResourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceOperation::Start => "start",
            ResourceOperation::End => "end",
            ResourceOperation::Prepare => "prepare",
            ResourceOperation::Commit => "commit",
            ResourceOperation::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// Failure reported by a participant
///
/// The `code` follows the participant's own convention (XA error codes for
/// connection-like participants); the harness only carries it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct ResourceError {
    /// Participant-specific error code
    pub code: i32,
    /// Human-readable message
    pub message: String,
}

impl ResourceError {
    /// Generic participant failure code
    pub const ERR: i32 = -3;

    /// Create a failure with the generic error code
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_code(Self::ERR, message)
    }

    /// Create a failure with a specific code
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
