use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

/// One open transaction on a persistence engine.
///
/// Engines hand these out from [`DataSource::begin`](super::data_source::DataSource::begin);
/// the transactional engine wraps them in a [`TransactionHandle`] and decides
/// when `commit` or `rollback` is called.
#[async_trait]
pub trait TransactionWrapper: Send + Sync {
    /// Runs a statement and returns the number of affected rows.
    async fn execute(
        &mut self,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<u64, TransactionError>;
    async fn rollback(self: Box<Self>) -> Result<(), TransactionError>;
    async fn commit(self: Box<Self>) -> Result<(), TransactionError>;
}

pub trait ToSql: Send + Sync + fmt::Debug {
    fn as_i32(&self) -> Option<i32> {
        None
    }
    fn as_i64(&self) -> Option<i64> {
        None
    }
    fn as_string(&self) -> Option<String> {
        None
    }
}

impl ToSql for i32 {
    fn as_i32(&self) -> Option<i32> {
        Some(*self)
    }
}

impl ToSql for i64 {
    fn as_i64(&self) -> Option<i64> {
        Some(*self)
    }
}

impl ToSql for String {
    fn as_string(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl ToSql for &'static str {
    fn as_string(&self) -> Option<String> {
        Some((*self).to_string())
    }
}

/// Isolation hint passed through to the engine unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Failed to begin transaction: {0}")]
    BeginError(String),
    #[error("Failed to execute query: {0}")]
    ExecutionError(String),
    #[error("Failed to commit transaction: {0}")]
    CommitError(String),
    #[error("Failed to rollback transaction: {0}")]
    RollbackError(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Parameter binding error: {0}")]
    BindError(String),
    #[error("Transaction {0} is already closed")]
    Closed(u64),
}

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Shared reference to an open transaction, bound into the ambient scope
/// under its data source name.
///
/// Identity is the `id`: two handles with the same id are the same
/// transaction. Once committed or rolled back the handle is closed and every
/// further call fails with [`TransactionError::Closed`].
pub struct TransactionHandle {
    id: u64,
    data_source: String,
    isolation_level: Option<IsolationLevel>,
    transaction: Mutex<Option<Box<dyn TransactionWrapper>>>,
}

impl TransactionHandle {
    pub fn new(
        data_source: impl Into<String>,
        isolation_level: Option<IsolationLevel>,
        transaction: Box<dyn TransactionWrapper>,
    ) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            data_source: data_source.into(),
            isolation_level,
            transaction: Mutex::new(Some(transaction)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn isolation_level(&self) -> Option<IsolationLevel> {
        self.isolation_level
    }

    pub async fn execute(
        &self,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<u64, TransactionError> {
        let mut guard = self.transaction.lock().await;
        match guard.as_mut() {
            Some(transaction) => transaction.execute(query, params).await,
            None => Err(TransactionError::Closed(self.id)),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.transaction.lock().await.is_some()
    }

    pub(crate) async fn commit(&self) -> Result<(), TransactionError> {
        let transaction = self.transaction.lock().await.take();
        match transaction {
            Some(transaction) => transaction.commit().await,
            None => Err(TransactionError::Closed(self.id)),
        }
    }

    pub(crate) async fn rollback(&self) -> Result<(), TransactionError> {
        let transaction = self.transaction.lock().await.take();
        match transaction {
            Some(transaction) => transaction.rollback().await,
            None => Err(TransactionError::Closed(self.id)),
        }
    }
}

impl fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("id", &self.id)
            .field("data_source", &self.data_source)
            .field("isolation_level", &self.isolation_level)
            .finish_non_exhaustive()
    }
}
