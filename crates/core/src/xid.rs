//! Transaction identifiers
//!
//! An [`Xid`] is an opaque token handed to participants. It is backed by a
//! monotonic counter encoded as 8 big-endian bytes; the global transaction
//! id and the branch qualifier are the same bytes and the format id is 0.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque transaction token
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Xid {
    bytes: [u8; 8],
}

impl Xid {
    /// Build the token for a counter value
    pub fn from_counter(counter: u64) -> Self {
        Self {
            bytes: counter.to_be_bytes(),
        }
    }

    /// Decode the counter value
    pub fn counter(&self) -> u64 {
        u64::from_be_bytes(self.bytes)
    }

    /// Format identifier (always 0)
    pub fn format_id(&self) -> i32 {
        0
    }

    /// Global transaction id bytes
    pub fn global_transaction_id(&self) -> &[u8] {
        &self.bytes
    }

    /// Branch qualifier bytes
    pub fn branch_qualifier(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.counter())
    }
}

impl fmt::Debug for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Xid({})", self.counter())
    }
}

/// Allocates unique, monotonically increasing transaction tokens
#[derive(Debug, Default)]
pub struct XidGenerator {
    next: AtomicU64,
}

impl XidGenerator {
    /// Create a generator starting at 0
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a generator whose first token encodes `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Allocate the next token
    pub fn next_xid(&self) -> Xid {
        Xid::from_counter(self.next.fetch_add(1, Ordering::SeqCst))
    }
}
