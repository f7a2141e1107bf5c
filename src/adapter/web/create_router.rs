use axum::routing::{delete, post};
use axum::Router;
use std::sync::Arc;

use crate::adapter::web::app_state::AppState;
use crate::adapter::web::route::users;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users", post(users::post))
        .route("/users/:id", delete(users::delete))
        .with_state(state)
}
