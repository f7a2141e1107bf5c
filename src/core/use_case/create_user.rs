use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::core::domain::entity::user::user::UnvalidatedCreateUserInput;
use crate::core::domain::entity::user::{User, UserCommand};
use crate::core::port::create_user::{
    CreateUserError, CreateUserInputBoundary, CreateUserOutputBoundary,
};
use crate::core::transactional::{TransactionOptions, TransactionalContext};

pub struct CreateUserUseCase {
    repository: Arc<dyn UserCommand>,
    context: Arc<TransactionalContext>,
    options: TransactionOptions,
}

impl CreateUserUseCase {
    pub fn new(repository: Arc<dyn UserCommand>, context: Arc<TransactionalContext>) -> Self {
        Self {
            repository,
            context,
            options: TransactionOptions::default().name("create_user"),
        }
    }

    pub fn with_options(mut self, options: TransactionOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl CreateUserInputBoundary for CreateUserUseCase {
    async fn execute(
        &self,
        input: UnvalidatedCreateUserInput,
        output_boundary: &mut dyn CreateUserOutputBoundary,
    ) -> Result<(), CreateUserError> {
        let user = User::try_from(input)?;
        let id = user.id;

        self.context
            .run_in_transaction(self.options.clone(), async {
                self.repository.insert(user).await?;
                self.context
                    .on_commit(move || info!(user_id = id, "user created"))?;
                Ok::<_, CreateUserError>(())
            })
            .await?;

        output_boundary.execute(id)?;

        Ok(())
    }
}
