use ambient_unit_of_work::adapter::config::AppConfig;
use ambient_unit_of_work::adapter::init::AppInitializer;
use ambient_unit_of_work::adapter::web::create_router::create_router;
use ambient_unit_of_work::error::ApplicationError;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;
    let state = AppInitializer::initialize(&config).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .map_err(|e| ApplicationError::ServerError(e.to_string()))?;
    info!(addr = config.listen_addr(), "server running");
    axum::serve(listener, app)
        .await
        .map_err(|e| ApplicationError::ServerError(e.to_string()))?;

    Ok(())
}
