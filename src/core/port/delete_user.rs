use thiserror::Error;

use crate::core::domain::command::CommandError;
use crate::core::transactional::TransactionalError;

#[derive(Debug, Error)]
pub enum DeleteUserError {
    #[error(transparent)]
    CommandError(#[from] CommandError),

    #[error(transparent)]
    TransactionError(#[from] TransactionalError),
}
