//! Main harness entry point.
//!
//! This module provides the `Harness` struct, the root context that ties the
//! directory, the coordinator and the persistence unit together.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use txharness_concurrency::{CoordinatorMetrics, ExecutionContext, TransactionManager};
use txharness_core::Resource;
use txharness_engine::registry::{self, PERSISTENCE_UNIT_NAME};
use txharness_engine::{
    HarnessConfig, PersistenceUnit, ResourceLocalTransaction, TransactionPolicy, Transactional,
};
use txharness_naming::Directory;

static GLOBAL: Lazy<Harness> = Lazy::new(|| {
    tracing::debug!("creating process-wide harness");
    Harness::from_parts(Arc::new(Directory::new()), HarnessConfig::default())
});

/// The transaction harness.
///
/// Owns the naming directory in which the coordinator and the persistence
/// unit are bound. Every harness created by [`Harness::new`] or
/// [`Harness::builder`] is isolated; [`Harness::global`] is the shared
/// process-wide one.
///
/// # Example
///
/// ```ignore
/// use txharness::prelude::*;
///
/// let harness = Harness::new()?;
/// let orders = harness.wrap(OrderService::default())?;
///
/// let ctx = harness.new_context();
/// orders.invoke(&ctx, |svc| svc.place(order))?;
/// ```
pub struct Harness {
    directory: Arc<Directory>,
    config: HarnessConfig,
}

impl Harness {
    /// Create an isolated harness with the default configuration.
    ///
    /// The default configuration uses managed transactions.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for harness configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let harness = Harness::builder()
    ///     .config_file("tests/harness.toml")
    ///     .build()?;
    /// ```
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::new()
    }

    /// The process-wide harness.
    ///
    /// Created on first use with the default configuration. Tests sharing
    /// it should call [`reset`](Self::reset) between cases.
    pub fn global() -> &'static Harness {
        &GLOBAL
    }

    fn from_parts(directory: Arc<Directory>, config: HarnessConfig) -> Self {
        Self { directory, config }
    }

    /// Get the naming directory.
    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    /// Get the configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Get the coordinator bound in the directory, binding it on first use.
    pub fn transaction_manager(&self) -> Result<Arc<TransactionManager>> {
        registry::transaction_manager(&self.directory, &self.config).map_err(Error::from)
    }

    /// Get the persistence unit bound in the directory, binding it on first use.
    pub fn persistence_unit(&self) -> Result<Arc<PersistenceUnit>> {
        registry::persistence_unit(&self.directory, &self.config).map_err(Error::from)
    }

    /// Build the policy used by wrapped targets.
    pub fn policy(&self) -> Result<TransactionPolicy> {
        Ok(TransactionPolicy::new(self.transaction_manager()?)
            .with_persistence_unit(self.persistence_unit()?))
    }

    /// Wrap `target` so every call through it is transaction-scoped.
    pub fn wrap<T>(&self, target: T) -> Result<Transactional<T>> {
        Ok(Transactional::new(target, self.policy()?))
    }

    /// Create a fresh execution context.
    pub fn new_context(&self) -> ExecutionContext {
        ExecutionContext::new()
    }

    /// Remove every type-keyed registration.
    ///
    /// String-named bindings, including the coordinator and the persistence
    /// unit, survive. Returns how many registrations were removed.
    pub fn reset(&self) -> usize {
        let removed = self.directory.clear();
        tracing::debug!(removed, "harness reset");
        removed
    }

    /// Get coordinator metrics.
    pub fn metrics(&self) -> Result<CoordinatorMetrics> {
        Ok(self.transaction_manager()?.metrics())
    }
}

/// Builder for harness configuration.
///
/// # Example
///
/// ```ignore
/// // Managed transactions with an enlisted connection
/// let harness = Harness::builder()
///     .config(HarnessConfig::default())
///     .connection(Arc::new(MyConnection::default()))
///     .build()?;
///
/// // Resource-local transactions owned by the persistence layer
/// let harness = Harness::builder()
///     .config(HarnessConfig::default().with_connection_url("jdbc:h2:mem:test"))
///     .local_transaction(Arc::new(LocalTransaction::new()))
///     .build()?;
/// ```
#[derive(Default)]
pub struct HarnessBuilder {
    config: Option<HarnessConfig>,
    config_path: Option<PathBuf>,
    directory: Option<Arc<Directory>>,
    local_transaction: Option<Arc<dyn ResourceLocalTransaction>>,
    connection: Option<Arc<dyn Resource>>,
}

impl HarnessBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config`.
    pub fn config(mut self, config: HarnessConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load the configuration from a TOML file at build time.
    ///
    /// Takes precedence over [`config`](Self::config).
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Share an existing directory instead of creating one.
    pub fn directory(mut self, directory: Arc<Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Use `transaction` as the persistence unit's own transaction.
    ///
    /// Puts the unit in resource-local mode regardless of the configuration.
    pub fn local_transaction(mut self, transaction: Arc<dyn ResourceLocalTransaction>) -> Self {
        self.local_transaction = Some(transaction);
        self
    }

    /// Enlist `connection` in every managed transaction the unit joins.
    pub fn connection(mut self, connection: Arc<dyn Resource>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Build the harness.
    ///
    /// Fails if the configuration cannot be loaded or names no connection.
    pub fn build(self) -> Result<Harness> {
        let config = match &self.config_path {
            Some(path) => HarnessConfig::from_path(path)?,
            None => {
                let config = self.config.unwrap_or_default();
                config.validate()?;
                config
            }
        };
        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(Directory::new()));

        let unit = match (self.local_transaction, self.connection) {
            (Some(local), _) => Some(PersistenceUnit::resource_local(
                config.persistence_unit.clone(),
                local,
            )),
            (None, Some(connection)) => Some(
                PersistenceUnit::from_config(&config).with_connection(connection),
            ),
            (None, None) => None,
        };
        if let Some(unit) = unit {
            tracing::debug!(unit = %unit.name(), mode = ?unit.mode(), "binding persistence unit");
            directory.rebind(PERSISTENCE_UNIT_NAME, Arc::new(unit))?;
        }

        Ok(Harness::from_parts(directory, config))
    }
}
