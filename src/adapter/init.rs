use crate::adapter::config::AppConfig;
use crate::adapter::store::pg::command::user::PgUserRepository;
use crate::adapter::store::pg::data_source::PgDataSource;
use crate::adapter::web::app_state::AppState;
use crate::core::domain::data_source::DEFAULT_DATA_SOURCE;
use crate::core::transactional::{TransactionalContext, TransactionalError};
use crate::core::use_case::create_user::CreateUserUseCase;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

pub struct AppInitializer;

impl AppInitializer {
    pub async fn initialize(config: &AppConfig) -> Result<Arc<AppState>, AppInitializerError> {
        let pool = PgPool::connect(config.db_url())
            .await
            .map_err(|e| AppInitializerError::DatabaseInitError(e.to_string()))?;

        let context = TransactionalContext::new(config.transactional().clone());
        let data_source =
            context.register_data_source(DEFAULT_DATA_SOURCE, Arc::new(PgDataSource::new(pool)), true)?;

        let user_repository = Arc::new(PgUserRepository::new(data_source));
        let user_create_use_case = Arc::new(CreateUserUseCase::new(
            user_repository.clone(),
            context.clone(),
        ));

        Ok(Arc::new(AppState {
            context,
            user_repository,
            user_create_use_case,
        }))
    }
}

#[derive(Debug, Error)]
pub enum AppInitializerError {
    #[error("Failed to initialize database: {0}")]
    DatabaseInitError(String),
    #[error(transparent)]
    TransactionalError(#[from] TransactionalError),
}
