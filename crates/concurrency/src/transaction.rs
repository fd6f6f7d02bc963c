//! A single attempt at atomic work
//!
//! A [`Transaction`] owns its status, the ordered list of enlisted
//! participants and the ordered list of completion listeners. Participants
//! and listeners are never reordered once added.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. end() every participant
//! 2. status = Preparing
//! 3. prepare() every participant
//! 4. status = Prepared, then Committing
//! 5. before_completion() on every listener
//! 6. commit(one_phase = true) every participant
//! 7. status = Committed
//! 8. after_completion(Committed) on every listener
//! ```
//!
//! Step 2 only happens if the transaction is still `Active`; a transaction
//! marked rollback-only while its participants were ending fails with
//! `IllegalState("Rollback only")`.
//!
//! ## Rollback Sequence
//!
//! ```text
//! 1. end() every participant not yet ended
//! 2. status = RollingBack
//! 3. before_completion() on every listener
//! 4. rollback() every participant not yet rolled back
//! 5. status = RolledBack
//! 6. after_completion(RolledBack) on every listener
//! ```
//!
//! Participant failures abort the sequence and surface as
//! `Error::ResourceOperation`. Each participant receives `end` at most once;
//! a rollback that failed part-way can be retried and resumes at the
//! participant that failed. Listener callbacks are delivered at most once
//! per transaction even if a failed commit is followed by a rollback.
//!
//! ## Failed commit step
//!
//! Once step 6 has started, participants before the failing one have
//! already committed, so the transaction is not rolled back. It completes
//! as `Unknown` with `after_completion(Unknown)`, and a later `rollback`
//! fails with `IllegalState`.
//!
//! No internal lock is held while participants or listeners run, so
//! callbacks may query the transaction or the coordinator.

use crate::context::{ContextInner, ExecutionContext};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use txharness_core::traits::ResourceResult;
use txharness_core::{Error, Resource, ResourceOperation, Result, Status, Synchronization, Xid};

/// An enlisted participant and how far the protocol got with it
struct Enlisted {
    resource: Arc<dyn Resource>,
    ended: bool,
    rolled_back: bool,
}

impl Enlisted {
    fn is(&self, resource: &Arc<dyn Resource>) -> bool {
        Arc::as_ptr(&self.resource) as *const () == Arc::as_ptr(resource) as *const ()
    }
}

struct TransactionState {
    status: Status,
    resources: Vec<Enlisted>,
    synchronizations: Vec<Arc<dyn Synchronization>>,
    before_completion_sent: bool,
    after_completion_sent: bool,
}

/// A transaction created by the coordinator
pub struct Transaction {
    xid: Xid,
    timeout: Option<Duration>,
    started_at: Instant,
    state: Mutex<TransactionState>,
    /// Execution context whose stack currently holds this transaction
    attached: Mutex<Option<Weak<ContextInner>>>,
}

impl Transaction {
    pub(crate) fn new(xid: Xid, timeout: Option<Duration>) -> Self {
        tracing::debug!(xid = %xid, "transaction created");
        Transaction {
            xid,
            timeout,
            started_at: Instant::now(),
            state: Mutex::new(TransactionState {
                status: Status::Active,
                resources: Vec::new(),
                synchronizations: Vec::new(),
                before_completion_sent: false,
                after_completion_sent: false,
            }),
            attached: Mutex::new(None),
        }
    }

    /// The transaction's token
    pub fn xid(&self) -> Xid {
        self.xid
    }

    /// Current status
    pub fn status(&self) -> Status {
        let status = self.state.lock().status;
        tracing::trace!(xid = %self.xid, %status, "status");
        status
    }

    /// Committed, rolled back or unknown
    pub fn is_finished(&self) -> bool {
        self.state.lock().status.is_finished()
    }

    /// Marked for mandatory rollback
    pub fn is_rollback_only(&self) -> bool {
        self.state.lock().status == Status::MarkedRollback
    }

    /// Timeout configured on the coordinator when this transaction began.
    ///
    /// Recorded only; nothing rolls the transaction back when it expires.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Time since the transaction began
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Number of enlisted participants
    pub fn resource_count(&self) -> usize {
        self.state.lock().resources.len()
    }

    /// Number of registered completion listeners
    pub fn synchronization_count(&self) -> usize {
        self.state.lock().synchronizations.len()
    }

    // ========================================================================
    // Participants and listeners
    // ========================================================================

    /// Enlist a participant and associate it with this transaction
    ///
    /// Calls `start` on the participant; if that fails the participant is
    /// not enlisted.
    pub fn enlist_resource(&self, resource: Arc<dyn Resource>) -> Result<()> {
        tracing::debug!(xid = %self.xid, "enlist resource");
        self.ensure_accepts_work("enlist a resource")?;
        if let Err(source) = resource.start(&self.xid) {
            tracing::error!(xid = %self.xid, error = %source, "resource start failed");
            return Err(Error::ResourceOperation {
                operation: ResourceOperation::Start,
                xid: self.xid,
                source,
            });
        }
        self.state.lock().resources.push(Enlisted {
            resource,
            ended: false,
            rolled_back: false,
        });
        Ok(())
    }

    /// Remove a participant
    ///
    /// Returns whether the participant was enlisted.
    pub fn delist_resource(&self, resource: &Arc<dyn Resource>) -> bool {
        tracing::debug!(xid = %self.xid, "delist resource");
        let mut state = self.state.lock();
        match state.resources.iter().position(|e| e.is(resource)) {
            Some(index) => {
                state.resources.remove(index);
                true
            }
            None => false,
        }
    }

    /// Register a completion listener
    pub fn register_synchronization(&self, synchronization: Arc<dyn Synchronization>) -> Result<()> {
        tracing::debug!(xid = %self.xid, "register synchronization");
        let mut state = self.state.lock();
        if !state.status.accepts_work() {
            return Err(Error::illegal_state(format!(
                "cannot register synchronization on transaction {} in {}",
                self.xid, state.status
            )));
        }
        state.synchronizations.push(synchronization);
        Ok(())
    }

    /// Register a listener without a status check (fresh transactions only)
    pub(crate) fn push_synchronization(&self, synchronization: Arc<dyn Synchronization>) {
        self.state.lock().synchronizations.push(synchronization);
    }

    /// Mark the transaction for mandatory rollback
    pub fn set_rollback_only(&self) -> Result<()> {
        tracing::debug!(xid = %self.xid, "set rollback only");
        let mut state = self.state.lock();
        match state.status {
            Status::Active | Status::MarkedRollback => {
                state.status = Status::MarkedRollback;
                Ok(())
            }
            other => Err(Error::illegal_state(format!(
                "cannot mark transaction {} rollback-only in {}",
                self.xid, other
            ))),
        }
    }

    // ========================================================================
    // Completion
    // ========================================================================

    /// Commit the transaction
    ///
    /// Only legal from `Active`. A rollback-only transaction fails with
    /// `IllegalState` and keeps its status.
    pub fn commit(&self) -> Result<()> {
        tracing::debug!(xid = %self.xid, "commit");
        Self::ensure_committable(self.xid, self.state.lock().status)?;

        self.end_resources()?;
        let synchronizations = {
            let mut state = self.state.lock();
            Self::ensure_committable(self.xid, state.status)?;
            state.status = Status::Preparing;
            state.synchronizations.clone()
        };

        let resources = self.resources();
        self.each_resource(&resources, ResourceOperation::Prepare, |r| {
            r.prepare(&self.xid)
        })?;
        self.set_status(Status::Prepared);

        self.set_status(Status::Committing);
        self.before_completion(&synchronizations);
        if let Err(e) = self.each_resource(&resources, ResourceOperation::Commit, |r| {
            r.commit(&self.xid, true)
        }) {
            tracing::warn!(xid = %self.xid, "commit step failed; outcome unknown");
            self.complete(Status::Unknown, &synchronizations);
            return Err(e);
        }
        self.complete(Status::Committed, &synchronizations);
        Ok(())
    }

    /// Roll the transaction back
    ///
    /// Legal from any non-terminal status before the commit step, including
    /// a commit that failed while ending or preparing. Participants already
    /// ended or rolled back are skipped.
    pub fn rollback(&self) -> Result<()> {
        tracing::debug!(xid = %self.xid, "rollback");
        let synchronizations = {
            let state = self.state.lock();
            if state.status.is_finished() || state.status == Status::Committing {
                return Err(Error::illegal_state(format!(
                    "cannot roll back transaction {} in {}",
                    self.xid, state.status
                )));
            }
            state.synchronizations.clone()
        };

        self.end_resources()?;
        self.set_status(Status::RollingBack);
        self.before_completion(&synchronizations);

        let pending: Vec<Arc<dyn Resource>> = {
            let state = self.state.lock();
            state
                .resources
                .iter()
                .filter(|e| !e.rolled_back)
                .map(|e| e.resource.clone())
                .collect()
        };
        for resource in &pending {
            self.each_resource(std::slice::from_ref(resource), ResourceOperation::Rollback, |r| {
                r.rollback(&self.xid)
            })?;
            self.mark(resource, |e| e.rolled_back = true);
        }
        self.complete(Status::RolledBack, &synchronizations);
        Ok(())
    }

    /// Send `end` to every participant that has not received it yet
    ///
    /// A participant counts as ended once `end` was called, even if it failed.
    fn end_resources(&self) -> Result<()> {
        let pending: Vec<Arc<dyn Resource>> = {
            let state = self.state.lock();
            state
                .resources
                .iter()
                .filter(|e| !e.ended)
                .map(|e| e.resource.clone())
                .collect()
        };
        for resource in &pending {
            self.mark(resource, |e| e.ended = true);
            self.each_resource(std::slice::from_ref(resource), ResourceOperation::End, |r| {
                r.end(&self.xid)
            })?;
        }
        Ok(())
    }

    fn resources(&self) -> Vec<Arc<dyn Resource>> {
        self.state
            .lock()
            .resources
            .iter()
            .map(|e| e.resource.clone())
            .collect()
    }

    fn mark<F: FnOnce(&mut Enlisted)>(&self, resource: &Arc<dyn Resource>, update: F) {
        let mut state = self.state.lock();
        if let Some(entry) = state.resources.iter_mut().find(|e| e.is(resource)) {
            update(entry);
        }
    }

    fn ensure_committable(xid: Xid, status: Status) -> Result<()> {
        match status {
            Status::Active => Ok(()),
            Status::MarkedRollback => Err(Error::illegal_state("Rollback only")),
            other => Err(Error::illegal_state(format!(
                "cannot commit transaction {} in {}",
                xid, other
            ))),
        }
    }

    fn each_resource<F>(
        &self,
        resources: &[Arc<dyn Resource>],
        operation: ResourceOperation,
        step: F,
    ) -> Result<()>
    where
        F: Fn(&dyn Resource) -> ResourceResult,
    {
        for resource in resources {
            if let Err(source) = step(resource.as_ref()) {
                tracing::error!(
                    xid = %self.xid,
                    %operation,
                    error = %source,
                    "resource operation failed"
                );
                return Err(Error::ResourceOperation {
                    operation,
                    xid: self.xid,
                    source,
                });
            }
        }
        Ok(())
    }

    fn ensure_accepts_work(&self, action: &str) -> Result<()> {
        let status = self.state.lock().status;
        if status.accepts_work() {
            Ok(())
        } else {
            Err(Error::illegal_state(format!(
                "cannot {} on transaction {} in {}",
                action, self.xid, status
            )))
        }
    }

    fn set_status(&self, status: Status) {
        self.state.lock().status = status;
    }

    fn before_completion(&self, synchronizations: &[Arc<dyn Synchronization>]) {
        {
            let mut state = self.state.lock();
            if state.before_completion_sent {
                return;
            }
            state.before_completion_sent = true;
        }
        for sync in synchronizations {
            sync.before_completion();
        }
    }

    fn complete(&self, status: Status, synchronizations: &[Arc<dyn Synchronization>]) {
        {
            let mut state = self.state.lock();
            state.status = status;
            if state.after_completion_sent {
                return;
            }
            state.after_completion_sent = true;
        }
        tracing::debug!(xid = %self.xid, %status, "transaction completed");
        for sync in synchronizations {
            sync.after_completion(status);
        }
    }

    // ========================================================================
    // Context attachment
    // ========================================================================

    pub(crate) fn attach(&self, context: Weak<ContextInner>) {
        *self.attached.lock() = Some(context);
    }

    pub(crate) fn detach(&self) {
        *self.attached.lock() = None;
    }

    /// Execution context whose stack holds this transaction, if any
    pub fn attached_context(&self) -> Option<ExecutionContext> {
        self.attached
            .lock()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(ExecutionContext::from_inner)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.xid)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Transaction")
            .field("xid", &self.xid)
            .field("status", &state.status)
            .field("resources", &state.resources.len())
            .field("synchronizations", &state.synchronizations.len())
            .finish()
    }
}
