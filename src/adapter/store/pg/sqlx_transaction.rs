use crate::core::domain::transaction::{ToSql, TransactionError, TransactionWrapper};
use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{Postgres, Transaction};

pub struct SqlxTransaction {
    transaction: Transaction<'static, Postgres>,
}

impl SqlxTransaction {
    pub fn new(transaction: Transaction<'static, Postgres>) -> Self {
        Self { transaction }
    }
}

pub(crate) fn bind_params<'q>(
    query: &'q str,
    params: Vec<Box<dyn ToSql>>,
) -> Result<Query<'q, Postgres, PgArguments>, TransactionError> {
    let mut sqlx_query = sqlx::query(query);

    for param in params {
        if let Some(value) = param.as_i32() {
            sqlx_query = sqlx_query.bind(value);
        } else if let Some(value) = param.as_i64() {
            sqlx_query = sqlx_query.bind(value);
        } else if let Some(value) = param.as_string() {
            sqlx_query = sqlx_query.bind(value);
        } else {
            return Err(TransactionError::BindError(format!(
                "Unsupported parameter type: {:?}",
                param
            )));
        }
    }

    Ok(sqlx_query)
}

#[async_trait]
impl TransactionWrapper for SqlxTransaction {
    async fn execute(
        &mut self,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<u64, TransactionError> {
        let result = bind_params(query, params)?
            .execute(&mut *self.transaction)
            .await
            .map_err(|e| {
                TransactionError::ExecutionError(format!(
                    "Failed to execute query: {:?}, error: {:?}",
                    query, e
                ))
            })?;
        Ok(result.rows_affected())
    }

    async fn rollback(self: Box<Self>) -> Result<(), TransactionError> {
        self.transaction
            .rollback()
            .await
            .map_err(|e| TransactionError::RollbackError(e.to_string()))
    }

    async fn commit(self: Box<Self>) -> Result<(), TransactionError> {
        self.transaction.commit().await.map_err(|e| {
            TransactionError::CommitError(format!("Failed to commit transaction: {:?}", e))
        })
    }
}
