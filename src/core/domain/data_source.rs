use async_trait::async_trait;

use crate::core::domain::transaction::{
    IsolationLevel, ToSql, TransactionError, TransactionWrapper,
};

/// Name under which a persistence engine is registered.
pub type DataSourceName = String;

pub const DEFAULT_DATA_SOURCE: &str = "default";

/// Version of the [`DataSource`] surface the ambient routing adapter wraps.
/// Engines built against a different surface must report their own value so
/// registration with `patch = true` can refuse them.
pub const DATA_SOURCE_INTERFACE_VERSION: u32 = 1;

/// A persistence engine: opens transactions and runs statements on its own
/// default connection.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn begin(
        &self,
        isolation_level: Option<IsolationLevel>,
    ) -> Result<Box<dyn TransactionWrapper>, TransactionError>;

    /// Runs a statement outside of any transaction this engine was asked to open.
    async fn execute(
        &self,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<u64, TransactionError>;

    fn interface_version(&self) -> u32 {
        DATA_SOURCE_INTERFACE_VERSION
    }
}
