use std::sync::Arc;

use crate::core::domain::entity::user::UserCommand;
use crate::core::port::create_user::CreateUserInputBoundary;
use crate::core::transactional::TransactionalContext;

pub struct AppState {
    pub context: Arc<TransactionalContext>,
    pub user_repository: Arc<dyn UserCommand>,
    pub user_create_use_case: Arc<dyn CreateUserInputBoundary>,
}
