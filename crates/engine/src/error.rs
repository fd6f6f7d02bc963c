//! Engine error types

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has unexpected fields
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Neither a connection URL nor a managed data source is configured
    #[error(
        "no connection configured for persistence unit '{unit}': set connection_url or jta_data_source"
    )]
    MissingConnection {
        /// Persistence unit name
        unit: String,
    },
}

/// Outcome of a failed transactional invocation
///
/// `Operation` carries the wrapped operation's own failure, returned after
/// the transaction was finalized. `Transaction` is a coordinator failure on
/// the primary path: beginning before the call, or committing after a
/// successful call. A coordinator failure never replaces an operation
/// failure.
pub enum InvocationError<E> {
    /// The wrapped operation failed
    Operation(E),
    /// The coordinator failed to begin or to complete the transaction
    Transaction(txharness_core::Error),
}

impl<E> InvocationError<E> {
    /// Check if the wrapped operation failed
    pub fn is_operation(&self) -> bool {
        matches!(self, InvocationError::Operation(_))
    }

    /// The operation's failure, if that is what happened
    pub fn operation(&self) -> Option<&E> {
        match self {
            InvocationError::Operation(e) => Some(e),
            InvocationError::Transaction(_) => None,
        }
    }

    /// Consume into the operation's failure
    pub fn into_operation(self) -> Option<E> {
        match self {
            InvocationError::Operation(e) => Some(e),
            InvocationError::Transaction(_) => None,
        }
    }

    /// The coordinator failure, if that is what happened
    pub fn transaction(&self) -> Option<&txharness_core::Error> {
        match self {
            InvocationError::Operation(_) => None,
            InvocationError::Transaction(e) => Some(e),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for InvocationError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationError::Operation(e) => f.debug_tuple("Operation").field(e).finish(),
            InvocationError::Transaction(e) => f.debug_tuple("Transaction").field(e).finish(),
        }
    }
}

impl<E: fmt::Display> fmt::Display for InvocationError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationError::Operation(e) => write!(f, "{}", e),
            InvocationError::Transaction(e) => write!(f, "transaction failed: {}", e),
        }
    }
}

impl<E> std::error::Error for InvocationError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InvocationError::Operation(e) => e.source(),
            InvocationError::Transaction(e) => Some(e),
        }
    }
}
