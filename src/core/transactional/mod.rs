//! Declarative, propagation-aware transactions over an ambient call-chain
//! context.
//!
//! ```ignore
//! let context = TransactionalContext::new(TransactionalOptions::default());
//! let users = context.register_data_source(DEFAULT_DATA_SOURCE, Arc::new(PgDataSource::new(pool)), true)?;
//!
//! context
//!     .run_in_transaction(TransactionOptions::default(), async {
//!         // `users.execute` joins the transaction opened for this call.
//!         users.execute("INSERT INTO users (name) VALUES ($1)", vec![Box::new(name)]).await?;
//!         context.on_commit(|| tracing::info!("user stored"))?;
//!         Ok::<_, AppError>(())
//!     })
//!     .await?;
//! ```

mod context;
mod error;
mod global;
mod hooks;
mod options;
mod registry;
pub mod storage;
mod wrapper;

pub use context::TransactionalContext;
pub use error::{ConfigurationError, IntegrationError, PropagationError, TransactionalError};
pub use global::{
    add_transactional_data_source, data_source_by_name, delete_data_source_by_name,
    initialize_transactional_context, run_in_transaction, run_on_transaction_commit,
    run_on_transaction_complete, run_on_transaction_rollback, transactional_context,
};
pub use hooks::{run_and_fire, run_in_new_hook_scope, HookEmitter, TransactionFailure};
pub use options::{TransactionOptions, TransactionalOptions, DEFAULT_MAX_HOOK_HANDLERS};
pub use registry::{AmbientDataSource, DataSourceRegistry};
pub use storage::StorageMode;
pub use wrapper::Transactional;
