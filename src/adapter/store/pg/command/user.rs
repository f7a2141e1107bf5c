use std::sync::Arc;

use async_trait::async_trait;
use crate::core::domain::command::{ensure_affected, CommandError};
use crate::core::domain::data_source::DataSource;
use crate::core::domain::entity::user::{User, UserCommand};
use crate::core::domain::transaction::{ToSql, TransactionError};

/// Writes through a data source registered with `patch = true`, so every
/// statement joins the transaction ambient for the caller.
pub struct PgUserRepository {
    data_source: Arc<dyn DataSource>,
}

impl PgUserRepository {
    pub fn new(data_source: Arc<dyn DataSource>) -> Self {
        Self { data_source }
    }
}

fn map_error(id: i32, e: TransactionError) -> CommandError {
    let message = e.to_string();
    if message.contains("unique constraint") || message.contains("duplicate key") {
        CommandError::user_already_exists(id)
    } else if message.contains("deadlock") {
        CommandError::ConcurrencyError { entity_type: "User".to_string() }
    } else {
        CommandError::DatabaseError(message)
    }
}

#[async_trait]
impl UserCommand for PgUserRepository {
    async fn insert(&self, user: User) -> Result<(), CommandError> {
        let query = "INSERT INTO users (id, name, email) VALUES ($1, $2, $3)";
        let params: Vec<Box<dyn ToSql>> = vec![
            Box::new(user.id) as Box<dyn ToSql>,
            Box::new(user.name) as Box<dyn ToSql>,
            Box::new(user.email) as Box<dyn ToSql>,
        ];
        let rows = self
            .data_source
            .execute(query, params)
            .await
            .map_err(|e| map_error(user.id, e))?;
        ensure_affected("Insert", rows)?;
        Ok(())
    }

    async fn update_email(&self, id: i32, email: String) -> Result<(), CommandError> {
        let query = "UPDATE users SET email = $2 WHERE id = $1";
        let params: Vec<Box<dyn ToSql>> = vec![
            Box::new(id) as Box<dyn ToSql>,
            Box::new(email) as Box<dyn ToSql>,
        ];
        let rows = self
            .data_source
            .execute(query, params)
            .await
            .map_err(|e| map_error(id, e))?;
        if rows == 0 {
            return Err(CommandError::user_not_found(id));
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), CommandError> {
        let query = "DELETE FROM users WHERE id = $1";
        let params: Vec<Box<dyn ToSql>> = vec![Box::new(id) as Box<dyn ToSql>];
        let rows = self
            .data_source
            .execute(query, params)
            .await
            .map_err(|e| map_error(id, e))?;
        ensure_affected("Delete", rows)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::store::memory::MemoryDataSource;
    use crate::core::domain::data_source::DEFAULT_DATA_SOURCE;
    use crate::core::port::create_user::CreateUserError;
    use crate::core::transactional::{
        StorageMode, TransactionOptions, TransactionalContext, TransactionalOptions,
    };

    #[tokio::test]
    async fn writes_join_the_ambient_transaction() {
        let context = TransactionalContext::new(TransactionalOptions {
            storage_mode: StorageMode::ExplicitStack,
            ..TransactionalOptions::default()
        });
        let engine = Arc::new(MemoryDataSource::new());
        let data_source = context
            .register_data_source(DEFAULT_DATA_SOURCE, engine.clone(), true)
            .unwrap();
        let repository = PgUserRepository::new(data_source);

        let result = context
            .run_in_transaction(TransactionOptions::default(), async {
                repository
                    .insert(User {
                        id: 1,
                        name: "Ada".to_string(),
                        email: "ada@example.com".to_string(),
                    })
                    .await?;
                repository.update_email(1, "ada@example.org".to_string()).await?;
                assert!(engine.committed().is_empty());
                Ok::<_, CreateUserError>(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(
            engine.committed_queries(),
            vec![
                "INSERT INTO users (id, name, email) VALUES ($1, $2, $3)",
                "UPDATE users SET email = $2 WHERE id = $1"
            ]
        );
    }

    #[test]
    fn driver_messages_map_to_domain_errors() {
        let duplicate = map_error(
            1,
            TransactionError::ExecutionError("duplicate key value violates unique constraint".into()),
        );
        assert!(matches!(duplicate, CommandError::AlreadyExists { .. }));

        let deadlock = map_error(1, TransactionError::ExecutionError("deadlock detected".into()));
        assert!(matches!(deadlock, CommandError::ConcurrencyError { .. }));

        let other = map_error(1, TransactionError::ConnectionError("refused".into()));
        assert!(matches!(other, CommandError::DatabaseError(_)));
    }
}
