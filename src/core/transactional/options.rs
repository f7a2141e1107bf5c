use serde::Deserialize;

use crate::core::domain::data_source::{DataSourceName, DEFAULT_DATA_SOURCE};
use crate::core::domain::propagation::Propagation;
use crate::core::domain::transaction::IsolationLevel;
use crate::core::transactional::storage::StorageMode;

pub const DEFAULT_MAX_HOOK_HANDLERS: usize = 10;

/// Library-wide settings, fixed when a context is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransactionalOptions {
    /// Listeners of one kind an emitter accepts before warning about a leak.
    /// `0` disables the check.
    pub max_hook_handlers: usize,
    pub storage_mode: StorageMode,
}

impl Default for TransactionalOptions {
    fn default() -> Self {
        Self {
            max_hook_handlers: DEFAULT_MAX_HOOK_HANDLERS,
            storage_mode: StorageMode::Auto,
        }
    }
}

/// Per-call settings for a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    pub data_source_name: DataSourceName,
    pub propagation: Propagation,
    pub isolation_level: Option<IsolationLevel>,
    /// Name of the wrapped operation, carried into log spans.
    pub name: Option<String>,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            data_source_name: DEFAULT_DATA_SOURCE.to_string(),
            propagation: Propagation::Required,
            isolation_level: None,
            name: None,
        }
    }
}

impl TransactionOptions {
    pub fn with_propagation(propagation: Propagation) -> Self {
        Self {
            propagation,
            ..Self::default()
        }
    }

    pub fn data_source(mut self, name: impl Into<String>) -> Self {
        self.data_source_name = name.into();
        self
    }

    pub fn propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn isolation_level(mut self, isolation_level: IsolationLevel) -> Self {
        self.isolation_level = Some(isolation_level);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
