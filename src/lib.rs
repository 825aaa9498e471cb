pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod middleware;
pub mod services;
pub mod storage;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::api::{create_api_router, ApiContext};
use crate::config::AppConfig;
use crate::middleware::auth::TokenKeys;
use crate::storage::ImageStore;

/// Builds the full application router on top of an already migrated database.
pub fn app(db: Arc<DatabaseConnection>, config: &AppConfig) -> Router {
    create_api_router(ApiContext {
        db,
        store: ImageStore::new(config.upload_dir.clone(), config.file_size_limit),
        keys: TokenKeys::new(&config.secret, config.token_ttl_hours),
    })
}
