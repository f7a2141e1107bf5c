//! Process-wide shortcuts over a single [`TransactionalContext`].
//!
//! Applications that do not want to pass the context around initialize it
//! once at startup; every function here fails with
//! [`ConfigurationError::NotInitialized`] until then.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::core::domain::data_source::{DataSource, DataSourceName};
use crate::core::transactional::context::TransactionalContext;
use crate::core::transactional::error::{ConfigurationError, TransactionalError};
use crate::core::transactional::hooks::TransactionFailure;
use crate::core::transactional::options::{TransactionOptions, TransactionalOptions};

static CONTEXT: OnceLock<Arc<TransactionalContext>> = OnceLock::new();

/// Creates the process-wide context. Later calls return the existing one and
/// ignore their options.
pub fn initialize_transactional_context(options: TransactionalOptions) -> Arc<TransactionalContext> {
    if let Some(context) = CONTEXT.get() {
        debug!("transactional context already initialized");
        return context.clone();
    }
    CONTEXT
        .get_or_init(|| TransactionalContext::new(options))
        .clone()
}

pub fn transactional_context() -> Result<Arc<TransactionalContext>, TransactionalError> {
    CONTEXT
        .get()
        .cloned()
        .ok_or_else(|| ConfigurationError::NotInitialized.into())
}

pub fn add_transactional_data_source(
    name: impl Into<DataSourceName>,
    engine: Arc<dyn DataSource>,
    patch: bool,
) -> Result<Arc<dyn DataSource>, TransactionalError> {
    transactional_context()?.register_data_source(name, engine, patch)
}

pub fn data_source_by_name(name: &str) -> Option<Arc<dyn DataSource>> {
    CONTEXT.get()?.data_source(name)
}

pub fn delete_data_source_by_name(name: &str) -> bool {
    CONTEXT
        .get()
        .is_some_and(|context| context.unregister_data_source(name))
}

pub async fn run_in_transaction<F, T, E>(options: TransactionOptions, work: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TransactionalError> + fmt::Display,
{
    let context = transactional_context()?;
    context.run_in_transaction(options, work).await
}

pub fn run_on_transaction_commit(hook: impl FnOnce() + Send + 'static) -> Result<(), TransactionalError> {
    transactional_context()?.on_commit(hook)
}

pub fn run_on_transaction_rollback(
    hook: impl FnOnce(&TransactionFailure) + Send + 'static,
) -> Result<(), TransactionalError> {
    transactional_context()?.on_rollback(hook)
}

pub fn run_on_transaction_complete(
    hook: impl FnOnce(Option<&TransactionFailure>) + Send + 'static,
) -> Result<(), TransactionalError> {
    transactional_context()?.on_complete(hook)
}
