use axum::http::StatusCode;

use crate::adapter::web::dto::created_user_web_output::CreatedUserWebOutput;
use crate::core::domain::command::CommandError;
use crate::core::port::create_user::{
    CreateUserError, CreateUserOutputBoundary, CreateUserOutputError,
};

pub struct CreateUserPresenter {
    pub(crate) output: Option<i32>,
}

impl CreateUserPresenter {
    pub fn new() -> Self {
        Self { output: None }
    }

    pub(crate) fn success(&self) -> Result<CreatedUserWebOutput, (StatusCode, String)> {
        match self.output {
            Some(id) => Ok(CreatedUserWebOutput { id }),
            None => Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Output not set by presenter".to_string(),
            )),
        }
    }

    pub(crate) fn failure(&self, error: CreateUserError) -> (StatusCode, String) {
        let status = match &error {
            CreateUserError::ValidationError(_) => StatusCode::BAD_REQUEST,
            CreateUserError::CommandError(CommandError::AlreadyExists { .. }) => StatusCode::CONFLICT,
            CreateUserError::CommandError(CommandError::ConcurrencyError { .. }) => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, format!("Failed to create user: {}", error))
    }
}

impl Default for CreateUserPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateUserOutputBoundary for CreateUserPresenter {
    fn execute(&mut self, output: i32) -> Result<(), CreateUserOutputError> {
        if let Some(existing) = self.output {
            return Err(CreateUserOutputError::AlreadySet(existing));
        }
        self.output = Some(output);
        Ok(())
    }
}
