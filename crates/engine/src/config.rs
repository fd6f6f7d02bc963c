//! Harness configuration
//!
//! The persistence unit is described by a small TOML document:
//!
//! ```toml
//! persistence_unit = "orders"
//! connection_url = "jdbc:h2:mem:orders"   # resource-local transactions
//! # jta_data_source = "java:/OrdersDS"    # or container-managed transactions
//! transaction_timeout_secs = 30
//! ```
//!
//! At least one of `connection_url` / `jta_data_source` must be set. A blank
//! `connection_url` selects managed (coordinator) transactions.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// How transactions are demarcated for the persistence unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Transactions come from the coordinator
    Managed,
    /// Transactions come from the persistence layer's own local transaction
    ResourceLocal,
}

fn default_persistence_unit() -> String {
    "default".to_string()
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Persistence unit name
    #[serde(default = "default_persistence_unit")]
    pub persistence_unit: String,

    /// Direct connection endpoint (resource-local mode)
    #[serde(default)]
    pub connection_url: Option<String>,

    /// Managed data source name (managed mode)
    #[serde(default)]
    pub jta_data_source: Option<String>,

    /// Timeout recorded on new transactions; never enforced
    #[serde(default)]
    pub transaction_timeout_secs: Option<u32>,
}

impl Default for HarnessConfig {
    /// Managed mode against a default data source
    fn default() -> Self {
        HarnessConfig {
            persistence_unit: default_persistence_unit(),
            connection_url: None,
            jta_data_source: Some("java:/DefaultDS".to_string()),
            transaction_timeout_secs: None,
        }
    }
}

impl HarnessConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: HarnessConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(
            path = %path.display(),
            unit = %config.persistence_unit,
            mode = ?config.transaction_mode(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Check that a connection is configured
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_blank(&self.connection_url) && is_blank(&self.jta_data_source) {
            return Err(ConfigError::MissingConnection {
                unit: self.persistence_unit.clone(),
            });
        }
        Ok(())
    }

    /// True when no direct connection URL is configured
    pub fn is_jta_data_source(&self) -> bool {
        is_blank(&self.connection_url)
    }

    /// Transaction demarcation implied by the configuration
    pub fn transaction_mode(&self) -> TransactionMode {
        if self.is_jta_data_source() {
            TransactionMode::Managed
        } else {
            TransactionMode::ResourceLocal
        }
    }

    /// Set the persistence unit name
    pub fn with_persistence_unit(mut self, name: impl Into<String>) -> Self {
        self.persistence_unit = name.into();
        self
    }

    /// Use a direct connection (resource-local mode)
    pub fn with_connection_url(mut self, url: impl Into<String>) -> Self {
        self.connection_url = Some(url.into());
        self
    }

    /// Use a managed data source (managed mode)
    pub fn with_jta_data_source(mut self, name: impl Into<String>) -> Self {
        self.connection_url = None;
        self.jta_data_source = Some(name.into());
        self
    }

    /// Set the recorded transaction timeout
    pub fn with_transaction_timeout(mut self, seconds: u32) -> Self {
        self.transaction_timeout_secs = Some(seconds);
        self
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
