use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use storefront::config::AppConfig;
use storefront::entities::{seed_admin, setup_schema};
use storefront::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let db = Database::connect(config.database_url.as_str()).await?;
    setup_schema(&db).await?;
    if let Some(seed) = &config.admin {
        seed_admin(&db, seed).await?;
    }

    let app = storefront::app(Arc::new(db), &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|err| AppError::Config(format!("Failed to bind {}: {err}", config.bind_addr)))?;
    tracing::info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, app)
        .await
        .map_err(|err| AppError::Internal(format!("Server error: {err}")))
}
