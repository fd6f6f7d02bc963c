//! Participant capabilities
//!
//! A [`Resource`] is an external unit of work (a connection, a queue
//! session) that observes transaction boundaries. A [`Synchronization`] is
//! notified around completion. Both are owned by whoever enlisted them; a
//! transaction keeps only a shared handle for its own lifetime.
//!
//! All callbacks are synchronous and are invoked sequentially in
//! enlistment/registration order.

use crate::error::ResourceError;
use crate::status::Status;
use crate::xid::Xid;

/// Result of a participant callback
pub type ResourceResult = std::result::Result<(), ResourceError>;

/// A participant enlisted in a transaction
pub trait Resource: Send + Sync {
    /// Associate the participant with `xid` (called on enlistment)
    fn start(&self, xid: &Xid) -> ResourceResult;

    /// Disassociate from `xid` with success, before completion
    fn end(&self, xid: &Xid) -> ResourceResult;

    /// Prepare to commit `xid`
    fn prepare(&self, xid: &Xid) -> ResourceResult;

    /// Commit `xid`
    fn commit(&self, xid: &Xid, one_phase: bool) -> ResourceResult;

    /// Roll back `xid`
    fn rollback(&self, xid: &Xid) -> ResourceResult;
}

/// A completion listener
pub trait Synchronization: Send + Sync {
    /// Called before the participants are committed or rolled back
    fn before_completion(&self);

    /// Called once the transaction reached its terminal status
    fn after_completion(&self, status: Status);
}
