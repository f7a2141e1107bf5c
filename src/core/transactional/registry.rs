use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::core::domain::data_source::{
    DataSource, DataSourceName, DATA_SOURCE_INTERFACE_VERSION,
};
use crate::core::domain::transaction::{
    IsolationLevel, ToSql, TransactionError, TransactionHandle, TransactionWrapper,
};
use crate::core::transactional::error::{
    ConfigurationError, IntegrationError, TransactionalError,
};
use crate::core::transactional::storage::{Storage, StorageDriver, StorageValue};

const DATA_SOURCE_KEY_PREFIX: &str = "data_source:";

fn handle_key(name: &str) -> String {
    format!("{DATA_SOURCE_KEY_PREFIX}{name}")
}

/// Named persistence engines, plus the ambient handle bound for each name.
pub struct DataSourceRegistry {
    storage: Storage,
    data_sources: RwLock<HashMap<DataSourceName, Arc<dyn DataSource>>>,
}

impl DataSourceRegistry {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            data_sources: RwLock::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Registers `engine` under `name`.
    ///
    /// With `patch`, the returned engine routes `execute` through the ambient
    /// transaction for `name` when one is bound. The registry itself keeps the
    /// unwrapped engine and opens transactions on it.
    pub fn register(
        self: &Arc<Self>,
        name: impl Into<DataSourceName>,
        engine: Arc<dyn DataSource>,
        patch: bool,
    ) -> Result<Arc<dyn DataSource>, TransactionalError> {
        let name = name.into();

        if patch && engine.interface_version() != DATA_SOURCE_INTERFACE_VERSION {
            return Err(IntegrationError::IncompatibleInterface {
                data_source: name,
                expected: DATA_SOURCE_INTERFACE_VERSION,
                found: engine.interface_version(),
            }
            .into());
        }

        {
            let mut data_sources = self.data_sources.write();
            if data_sources.contains_key(&name) {
                return Err(ConfigurationError::DuplicateDataSource(name).into());
            }
            data_sources.insert(name.clone(), engine.clone());
        }
        debug!(data_source = %name, patch, "registered data source");

        if !patch {
            return Ok(engine);
        }
        Ok(Arc::new(AmbientDataSource {
            name,
            inner: engine,
            registry: Arc::clone(self),
        }))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.data_sources.read().get(name).cloned()
    }

    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.data_sources.write().remove(name).is_some();
        if removed {
            debug!(data_source = %name, "unregistered data source");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data_sources.read().contains_key(name)
    }

    /// Handle bound for `name` in the current scope; `None` for unknown names.
    pub fn get_handle(&self, name: &str) -> Option<Arc<TransactionHandle>> {
        if !self.contains(name) {
            return None;
        }
        self.storage.get_typed::<TransactionHandle>(&handle_key(name))
    }

    /// Binds or clears the handle for `name` in the current scope. Ignored for
    /// unknown names.
    pub fn set_handle(&self, name: &str, handle: Option<Arc<TransactionHandle>>) {
        if !self.contains(name) {
            return;
        }
        self.storage
            .set(&handle_key(name), handle.map(|handle| handle as StorageValue));
    }
}

/// Engine returned by [`DataSourceRegistry::register`] when patching: plain
/// `execute` calls join the ambient transaction for the engine's name.
pub struct AmbientDataSource {
    name: DataSourceName,
    inner: Arc<dyn DataSource>,
    registry: Arc<DataSourceRegistry>,
}

#[async_trait]
impl DataSource for AmbientDataSource {
    async fn begin(
        &self,
        isolation_level: Option<IsolationLevel>,
    ) -> Result<Box<dyn TransactionWrapper>, TransactionError> {
        self.inner.begin(isolation_level).await
    }

    async fn execute(
        &self,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<u64, TransactionError> {
        match self.registry.get_handle(&self.name) {
            Some(handle) => handle.execute(query, params).await,
            None => self.inner.execute(query, params).await,
        }
    }

    fn interface_version(&self) -> u32 {
        self.inner.interface_version()
    }
}
