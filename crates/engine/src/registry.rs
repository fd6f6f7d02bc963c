//! Well-known directory names
//!
//! The coordinator and the persistence unit are process singletons bound in
//! the directory. The first lookup creates and binds them; later lookups
//! return the bound instance.

use crate::config::HarnessConfig;
use crate::persistence::PersistenceUnit;
use std::sync::Arc;
use txharness_concurrency::TransactionManager;
use txharness_core::Result;
use txharness_naming::Directory;

/// Name the transaction coordinator is bound under
pub const TRANSACTION_MANAGER_NAME: &str = "java:/TransactionManager";

/// Name the persistence unit is bound under
pub const PERSISTENCE_UNIT_NAME: &str = "java:/EntityManager";

/// Look up the coordinator, creating and binding it on first use
///
/// A newly created coordinator takes its default timeout from `config`.
/// Fails with `WrongType` if something else is bound under the name.
pub fn transaction_manager(
    directory: &Directory,
    config: &HarnessConfig,
) -> Result<Arc<TransactionManager>> {
    directory.get_or_bind_with(TRANSACTION_MANAGER_NAME, || {
        let manager = TransactionManager::new();
        if let Some(seconds) = config.transaction_timeout_secs {
            manager.set_transaction_timeout(seconds);
        }
        manager
    })
}

/// Look up the persistence unit, creating and binding it on first use
pub fn persistence_unit(
    directory: &Directory,
    config: &HarnessConfig,
) -> Result<Arc<PersistenceUnit>> {
    directory.get_or_bind_with(PERSISTENCE_UNIT_NAME, || PersistenceUnit::from_config(config))
}
