//! Transaction status
//!
//! State transitions:
//! - `Active` → `MarkedRollback` (set rollback-only)
//! - `Active` → `Preparing` → `Prepared` → `Committing` → `Committed` (commit)
//! - `Active` | `MarkedRollback` → `RollingBack` → `RolledBack` (rollback)
//!
//! Terminal states (no transitions allowed):
//! - `Committed`
//! - `RolledBack`
//!
//! `NoTransaction` is never the status of a transaction; it is the sentinel
//! the coordinator reports for an execution context with an empty stack.

use std::fmt;

/// Status of a transaction in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Transaction is executing and accepts work
    Active,
    /// Transaction must be rolled back at completion
    MarkedRollback,
    /// All participants voted to commit
    Prepared,
    /// Transaction committed
    Committed,
    /// Transaction rolled back
    RolledBack,
    /// Status cannot be determined
    Unknown,
    /// No transaction is associated with the execution context
    NoTransaction,
    /// First commit phase in progress
    Preparing,
    /// Second commit phase in progress
    Committing,
    /// Rollback in progress
    RollingBack,
}

impl Status {
    /// Conventional integer code for this status
    pub fn code(self) -> i32 {
        match self {
            Status::Active => 0,
            Status::MarkedRollback => 1,
            Status::Prepared => 2,
            Status::Committed => 3,
            Status::RolledBack => 4,
            Status::Unknown => 5,
            Status::NoTransaction => 6,
            Status::Preparing => 7,
            Status::Committing => 8,
            Status::RollingBack => 9,
        }
    }

    /// Map a conventional integer code back to a status
    pub fn from_code(code: i32) -> Option<Status> {
        let status = match code {
            0 => Status::Active,
            1 => Status::MarkedRollback,
            2 => Status::Prepared,
            3 => Status::Committed,
            4 => Status::RolledBack,
            5 => Status::Unknown,
            6 => Status::NoTransaction,
            7 => Status::Preparing,
            8 => Status::Committing,
            9 => Status::RollingBack,
            _ => return None,
        };
        Some(status)
    }

    /// Canonical upper-case name
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "STATUS_ACTIVE",
            Status::MarkedRollback => "STATUS_MARKED_ROLLBACK",
            Status::Prepared => "STATUS_PREPARED",
            Status::Committed => "STATUS_COMMITTED",
            Status::RolledBack => "STATUS_ROLLEDBACK",
            Status::Unknown => "STATUS_UNKNOWN",
            Status::NoTransaction => "STATUS_NO_TRANSACTION",
            Status::Preparing => "STATUS_PREPARING",
            Status::Committing => "STATUS_COMMITTING",
            Status::RollingBack => "STATUS_ROLLING_BACK",
        }
    }

    /// Committed or rolled back
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Committed | Status::RolledBack)
    }

    /// The transaction has finished or can no longer be reasoned about.
    ///
    /// A transaction in any other status is still live on its stack.
    pub fn is_finished(self) -> bool {
        self.is_terminal() || self == Status::Unknown
    }

    /// Still accepts participants and listeners
    pub fn accepts_work(self) -> bool {
        matches!(self, Status::Active | Status::MarkedRollback)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
