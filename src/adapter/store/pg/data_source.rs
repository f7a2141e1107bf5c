use async_trait::async_trait;
use sqlx::PgPool;

use crate::adapter::store::pg::sqlx_transaction::{bind_params, SqlxTransaction};
use crate::core::domain::data_source::DataSource;
use crate::core::domain::transaction::{
    IsolationLevel, ToSql, TransactionError, TransactionWrapper,
};

/// Postgres engine over a sqlx pool.
pub struct PgDataSource {
    pool: PgPool,
}

impl PgDataSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataSource for PgDataSource {
    async fn begin(
        &self,
        isolation_level: Option<IsolationLevel>,
    ) -> Result<Box<dyn TransactionWrapper>, TransactionError> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|e| TransactionError::ConnectionError(e.to_string()))?;

        if let Some(level) = isolation_level {
            sqlx::query(&format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql()))
                .execute(&mut *transaction)
                .await
                .map_err(|e| TransactionError::BeginError(e.to_string()))?;
        }

        Ok(Box::new(SqlxTransaction::new(transaction)))
    }

    async fn execute(
        &self,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<u64, TransactionError> {
        let result = bind_params(query, params)?
            .execute(&self.pool)
            .await
            .map_err(|e| {
                TransactionError::ExecutionError(format!(
                    "Failed to execute query: {:?}, error: {:?}",
                    query, e
                ))
            })?;
        Ok(result.rows_affected())
    }
}
