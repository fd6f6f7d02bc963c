//! Harness Integration Test Suite
//!
//! End-to-end scenarios across the directory, the coordinator and the
//! transactional wrapper, driven through the public `txharness` API.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test harness
//!
//! # Run wrapper scenarios only
//! cargo test --test harness wrapper::
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use txharness::prelude::*;
use txharness::ResourceOperation;

// Test modules
pub mod config;
pub mod directory;
pub mod wrapper;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Route `tracing` output to the test writer (first call wins)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Create an isolated managed-mode harness
pub fn create_harness() -> Harness {
    init_tracing();
    Harness::new().expect("Failed to create harness")
}

/// Ordered record of participant and listener callbacks
#[derive(Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Events recorded by `name`, without the name prefix
    pub fn events_of(&self, name: &str) -> Vec<String> {
        let prefix = format!("{}:", name);
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

/// Participant that journals every callback and can fail one step
pub struct Participant {
    name: String,
    journal: Journal,
    fail_on: Option<ResourceOperation>,
}

impl Participant {
    pub fn new(name: &str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            journal: journal.clone(),
            fail_on: None,
        })
    }

    pub fn failing(name: &str, journal: &Journal, operation: ResourceOperation) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            journal: journal.clone(),
            fail_on: Some(operation),
        })
    }

    fn step(&self, operation: ResourceOperation) -> ResourceResult {
        self.journal.record(format!("{}:{}", self.name, operation));
        if self.fail_on == Some(operation) {
            return Err(ResourceError::new(format!("{} refused {}", self.name, operation)));
        }
        Ok(())
    }
}

impl Resource for Participant {
    fn start(&self, _xid: &Xid) -> ResourceResult {
        self.step(ResourceOperation::Start)
    }

    fn end(&self, _xid: &Xid) -> ResourceResult {
        self.step(ResourceOperation::End)
    }

    fn prepare(&self, _xid: &Xid) -> ResourceResult {
        self.step(ResourceOperation::Prepare)
    }

    fn commit(&self, _xid: &Xid, one_phase: bool) -> ResourceResult {
        assert!(one_phase, "commit is always one-phase");
        self.step(ResourceOperation::Commit)
    }

    fn rollback(&self, _xid: &Xid) -> ResourceResult {
        self.step(ResourceOperation::Rollback)
    }
}

/// Completion listener that journals both callbacks
pub struct Listener {
    name: String,
    journal: Journal,
}

impl Listener {
    pub fn new(name: &str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            journal: journal.clone(),
        })
    }
}

impl Synchronization for Listener {
    fn before_completion(&self) {
        self.journal.record(format!("{}:before", self.name));
    }

    fn after_completion(&self, status: Status) {
        self.journal.record(format!("{}:after:{}", self.name, status));
    }
}
