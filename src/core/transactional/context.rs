use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error};

use crate::core::domain::data_source::{DataSource, DataSourceName};
use crate::core::domain::propagation::Propagation;
use crate::core::domain::transaction::{IsolationLevel, TransactionHandle};
use crate::core::transactional::error::{
    ConfigurationError, PropagationError, TransactionalError,
};
use crate::core::transactional::hooks::{self, TransactionFailure};
use crate::core::transactional::options::{TransactionOptions, TransactionalOptions};
use crate::core::transactional::registry::DataSourceRegistry;
use crate::core::transactional::storage::{Storage, StorageDriver, StorageMode};
use crate::core::transactional::wrapper::Transactional;

/// Entry point of the library: owns the context store and the data source
/// registry, and runs units of work under a propagation mode.
///
/// Nothing is stored between calls beyond what the registry holds; the
/// ambient handle and hook emitter live in the scopes `run_in_transaction`
/// opens and vanish with them.
pub struct TransactionalContext {
    options: TransactionalOptions,
    registry: Arc<DataSourceRegistry>,
}

impl TransactionalContext {
    pub fn new(options: TransactionalOptions) -> Arc<Self> {
        let storage = Storage::create(options.storage_mode);
        debug!(
            storage_mode = ?storage.mode(),
            max_hook_handlers = options.max_hook_handlers,
            "initialized transactional context"
        );
        Arc::new(Self {
            options,
            registry: Arc::new(DataSourceRegistry::new(storage)),
        })
    }

    pub fn options(&self) -> &TransactionalOptions {
        &self.options
    }

    /// The driver `Auto` resolved to.
    pub fn storage_mode(&self) -> StorageMode {
        self.storage().mode()
    }

    fn storage(&self) -> &Storage {
        self.registry.storage()
    }

    pub fn register_data_source(
        &self,
        name: impl Into<DataSourceName>,
        engine: Arc<dyn DataSource>,
        patch: bool,
    ) -> Result<Arc<dyn DataSource>, TransactionalError> {
        self.registry.register(name, engine, patch)
    }

    pub fn data_source(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.registry.get(name)
    }

    pub fn unregister_data_source(&self, name: &str) -> bool {
        self.registry.unregister(name)
    }

    /// The transaction ambient for `name` in the calling chain, if any.
    pub fn current_transaction(&self, name: &str) -> Option<Arc<TransactionHandle>> {
        if !self.storage().is_active() {
            return None;
        }
        self.registry.get_handle(name)
    }

    /// Runs `work` according to `options.propagation`.
    ///
    /// The caller's error type carries the library's own failures, so a
    /// propagation violation or a failed commit comes back as `E`. Errors
    /// produced by `work` are returned unchanged.
    pub async fn run_in_transaction<F, T, E>(
        &self,
        options: TransactionOptions,
        work: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<TransactionalError> + fmt::Display,
    {
        let name = options.data_source_name;
        let data_source = self
            .registry
            .get(&name)
            .ok_or_else(|| lift::<E, _>(ConfigurationError::DataSourceNotFound(name.clone())))?;
        let propagation = options.propagation;
        let isolation_level = options.isolation_level;
        let unit = options.name;

        self.storage()
            .run_scoped(async move {
                let current = self.registry.get_handle(&name);
                debug!(
                    data_source = %name,
                    %propagation,
                    unit = ?unit,
                    ambient = current.as_ref().map(|handle| handle.id()),
                    "resolving propagation"
                );

                match (propagation, current) {
                    (Propagation::Mandatory, None) => {
                        Err(lift::<E, _>(PropagationError::MandatoryWithoutTransaction))
                    }
                    (Propagation::Never, Some(_)) => {
                        Err(lift::<E, _>(PropagationError::NeverWithTransaction))
                    }
                    (Propagation::Mandatory, Some(_))
                    | (Propagation::Supports, Some(_))
                    | (Propagation::Required, Some(_))
                    | (Propagation::NotSupported, None) => work.await,
                    (Propagation::Never, None) | (Propagation::Supports, None) => {
                        self.run_with_new_hook(work).await
                    }
                    (Propagation::NotSupported, Some(suspended)) => {
                        self.registry.set_handle(&name, None);
                        let result = self.run_with_new_hook(work).await;
                        self.registry.set_handle(&name, Some(suspended));
                        result
                    }
                    (Propagation::Required, None)
                    | (Propagation::RequiresNew, _)
                    | (Propagation::Nested, _) => {
                        self.run_with_new_transaction(
                            data_source,
                            &name,
                            unit.as_deref(),
                            isolation_level,
                            work,
                        )
                        .await
                    }
                }
            })
            .await
    }

    async fn run_with_new_hook<F, T, E>(&self, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        hooks::run_in_new_hook_scope(self.storage(), self.options.max_hook_handlers, work).await
    }

    /// Opens a transaction on `data_source`, binds it for the duration of
    /// `work`, then commits or rolls back on the outcome.
    ///
    /// A failed rollback is logged; the error from `work` is still the one
    /// returned.
    async fn run_with_new_transaction<F, T, E>(
        &self,
        data_source: Arc<dyn DataSource>,
        name: &str,
        unit: Option<&str>,
        isolation_level: Option<IsolationLevel>,
        work: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<TransactionalError> + fmt::Display,
    {
        self.run_with_new_hook(async move {
            let transaction = data_source
                .begin(isolation_level)
                .await
                .map_err(lift::<E, _>)?;
            let handle = Arc::new(TransactionHandle::new(name, isolation_level, transaction));
            debug!(data_source = %name, handle = handle.id(), ?unit, ?isolation_level, "opened transaction");

            self.registry.set_handle(name, Some(handle.clone()));
            let result = work.await;
            self.registry.set_handle(name, None);

            match result {
                Ok(value) => {
                    handle.commit().await.map_err(lift::<E, _>)?;
                    debug!(data_source = %name, handle = handle.id(), ?unit, "committed transaction");
                    Ok(value)
                }
                Err(e) => {
                    match handle.rollback().await {
                        Ok(()) => {
                            debug!(data_source = %name, handle = handle.id(), ?unit, error = %e, "rolled back transaction")
                        }
                        Err(rollback_err) => error!(
                            data_source = %name,
                            handle = handle.id(),
                            ?unit,
                            error = %e,
                            rollback_error = %rollback_err,
                            "failed to roll back transaction"
                        ),
                    }
                    Err(e)
                }
            }
        })
        .await
    }

    /// Wraps `method` so every call runs under `options`.
    pub fn transactional<F>(
        self: &Arc<Self>,
        name: impl Into<String>,
        options: TransactionOptions,
        method: F,
    ) -> Transactional<F> {
        Transactional::new(Arc::clone(self), name, options, method)
    }

    pub fn on_commit(&self, hook: impl FnOnce() + Send + 'static) -> Result<(), TransactionalError> {
        hooks::current_emitter(self.storage())?.on_commit(hook);
        Ok(())
    }

    pub fn on_rollback(
        &self,
        hook: impl FnOnce(&TransactionFailure) + Send + 'static,
    ) -> Result<(), TransactionalError> {
        hooks::current_emitter(self.storage())?.on_rollback(hook);
        Ok(())
    }

    pub fn on_complete(
        &self,
        hook: impl FnOnce(Option<&TransactionFailure>) + Send + 'static,
    ) -> Result<(), TransactionalError> {
        hooks::current_emitter(self.storage())?.on_complete(hook);
        Ok(())
    }
}

fn lift<E, X>(error: X) -> E
where
    E: From<TransactionalError>,
    X: Into<TransactionalError>,
{
    E::from(error.into())
}
