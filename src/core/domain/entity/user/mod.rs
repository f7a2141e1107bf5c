pub mod user;

use async_trait::async_trait;
use crate::core::domain::command::CommandError;

#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// Writes users through whatever transaction is ambient for the
/// repository's data source.
#[async_trait]
pub trait UserCommand: Send + Sync {
    async fn insert(&self, user: User) -> Result<(), CommandError>;
    async fn update_email(&self, id: i32, email: String) -> Result<(), CommandError>;
    async fn delete(&self, id: i32) -> Result<(), CommandError>;
}
