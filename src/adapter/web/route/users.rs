use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::adapter::web::app_state::AppState;
use crate::adapter::web::dto::create_user_web_input::CreateUserWebInput;
use crate::adapter::web::dto::created_user_web_output::CreatedUserWebOutput;
use crate::adapter::web::handler::users::UserHandler;

pub async fn post(
    State(state): State<Arc<AppState>>,
    Json(user): Json<CreateUserWebInput>,
) -> Result<(StatusCode, Json<CreatedUserWebOutput>), (StatusCode, String)> {
    UserHandler::new(state).create_user(user).await
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, (StatusCode, String)> {
    UserHandler::new(state).delete_user(id).await
}
