//! Persistence unit
//!
//! The persistence collaborator the wrapper demarcates transactions for. In
//! managed mode it joins the coordinator's current transaction, enlisting
//! its connection as a resource when it has one. In resource-local mode it
//! owns a [`ResourceLocalTransaction`] and the coordinator is not involved.

use crate::config::{HarnessConfig, TransactionMode};
use crate::local::{LocalTransaction, ResourceLocalTransaction};
use std::fmt;
use std::sync::Arc;
use txharness_concurrency::{ExecutionContext, TransactionManager};
use txharness_core::{Error, Resource, Result};

enum Transactions {
    Managed { connection: Option<Arc<dyn Resource>> },
    ResourceLocal(Arc<dyn ResourceLocalTransaction>),
}

/// A named persistence unit
pub struct PersistenceUnit {
    name: String,
    transactions: Transactions,
}

impl PersistenceUnit {
    /// Unit whose transactions come from the coordinator
    pub fn managed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transactions: Transactions::Managed { connection: None },
        }
    }

    /// Unit that demarcates its own transactions
    pub fn resource_local(
        name: impl Into<String>,
        transaction: Arc<dyn ResourceLocalTransaction>,
    ) -> Self {
        Self {
            name: name.into(),
            transactions: Transactions::ResourceLocal(transaction),
        }
    }

    /// Build the unit the configuration describes
    ///
    /// Resource-local configurations get an in-memory [`LocalTransaction`].
    pub fn from_config(config: &HarnessConfig) -> Self {
        match config.transaction_mode() {
            TransactionMode::Managed => Self::managed(config.persistence_unit.clone()),
            TransactionMode::ResourceLocal => Self::resource_local(
                config.persistence_unit.clone(),
                Arc::new(LocalTransaction::new()),
            ),
        }
    }

    /// Enlist `connection` whenever the unit joins a managed transaction
    ///
    /// Has no effect on a resource-local unit.
    pub fn with_connection(mut self, connection: Arc<dyn Resource>) -> Self {
        if let Transactions::Managed { connection: slot } = &mut self.transactions {
            *slot = Some(connection);
        }
        self
    }

    /// Unit name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How this unit's transactions are demarcated
    pub fn mode(&self) -> TransactionMode {
        match self.transactions {
            Transactions::Managed { .. } => TransactionMode::Managed,
            Transactions::ResourceLocal(_) => TransactionMode::ResourceLocal,
        }
    }

    /// The unit's own transaction; `None` in managed mode
    pub fn local_transaction(&self) -> Option<&Arc<dyn ResourceLocalTransaction>> {
        match &self.transactions {
            Transactions::Managed { .. } => None,
            Transactions::ResourceLocal(tx) => Some(tx),
        }
    }

    /// Join the coordinator's current transaction in `ctx`
    ///
    /// Enlists the unit's connection, if any. Fails when the context has no
    /// transaction or the unit is resource-local.
    pub fn join_transaction(&self, manager: &TransactionManager, ctx: &ExecutionContext) -> Result<()> {
        let connection = match &self.transactions {
            Transactions::Managed { connection } => connection,
            Transactions::ResourceLocal(_) => {
                return Err(Error::illegal_state(format!(
                    "Persistence unit '{}' uses resource-local transactions",
                    self.name
                )))
            }
        };
        let tx = manager
            .transaction(ctx)
            .ok_or_else(|| Error::illegal_state("No transaction"))?;
        if let Some(connection) = connection {
            tx.enlist_resource(Arc::clone(connection))?;
        }
        tracing::debug!(unit = %self.name, xid = %tx.xid(), "persistence unit joined transaction");
        Ok(())
    }
}

impl fmt::Debug for PersistenceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceUnit")
            .field("name", &self.name)
            .field("mode", &self.mode())
            .finish()
    }
}
