//! Propagation-aware transactions for async call chains.
//!
//! Mark a unit of work with a [`Propagation`] mode and nested calls join,
//! suspend or isolate themselves relative to the transaction already ambient
//! for the calling chain, without passing a connection through every call.
//! See [`core::transactional`] for the engine and [`adapter`] for the
//! Postgres and in-memory engines plus the demo HTTP surface.

pub mod adapter;
pub mod core;
pub mod error;

pub use crate::core::domain::data_source::{DataSource, DataSourceName, DEFAULT_DATA_SOURCE};
pub use crate::core::domain::propagation::Propagation;
pub use crate::core::domain::transaction::{
    IsolationLevel, ToSql, TransactionError, TransactionHandle, TransactionWrapper,
};
pub use crate::core::transactional::{
    add_transactional_data_source, data_source_by_name, delete_data_source_by_name,
    initialize_transactional_context, run_in_transaction, run_on_transaction_commit,
    run_on_transaction_complete, run_on_transaction_rollback, ConfigurationError,
    IntegrationError, PropagationError, StorageMode, Transactional, TransactionalContext,
    TransactionalError, TransactionFailure, TransactionOptions, TransactionalOptions,
};
