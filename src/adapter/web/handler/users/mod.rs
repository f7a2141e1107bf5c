use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::adapter::web::app_state::AppState;
use crate::adapter::web::dto::create_user_web_input::CreateUserWebInput;
use crate::adapter::web::dto::created_user_web_output::CreatedUserWebOutput;
use crate::adapter::web::presenter::create_user::CreateUserPresenter;
use crate::core::domain::command::CommandError;
use crate::core::domain::entity::user::user::UnvalidatedCreateUserInput;
use crate::core::port::delete_user::DeleteUserError;
use crate::core::transactional::TransactionOptions;

pub struct UserHandler {
    state: Arc<AppState>,
}

impl UserHandler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn create_user(
        &self,
        user: CreateUserWebInput,
    ) -> Result<(StatusCode, Json<CreatedUserWebOutput>), (StatusCode, String)> {
        let mut presenter = CreateUserPresenter::new();
        let input = UnvalidatedCreateUserInput::from(user);

        if let Err(error) = self
            .state
            .user_create_use_case
            .execute(input, &mut presenter)
            .await
        {
            return Err(presenter.failure(error));
        }
        let output = presenter.success()?;
        Ok((StatusCode::CREATED, Json(output)))
    }

    /// Deletes through the patched repository inside a `delete_user`
    /// transaction; a missing row maps to 404.
    pub async fn delete_user(&self, id: i32) -> Result<StatusCode, (StatusCode, String)> {
        let repository = self.state.user_repository.clone();
        let delete_user = self.state.context.transactional(
            "delete_user",
            TransactionOptions::default(),
            move |id: i32| {
                let repository = repository.clone();
                async move { repository.delete(id).await.map_err(DeleteUserError::from) }
            },
        );

        match delete_user.call(id).await {
            Ok(()) => Ok(StatusCode::NO_CONTENT),
            Err(error @ DeleteUserError::CommandError(CommandError::NoRowsAffected { .. })) => {
                Err((StatusCode::NOT_FOUND, error.to_string()))
            }
            Err(error) => Err((StatusCode::INTERNAL_SERVER_ERROR, error.to_string())),
        }
    }
}
