pub mod admin;
pub mod public;
pub mod user;

use axum::{middleware::from_fn, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::middleware::{auth::TokenKeys, logging::logging_middleware};
use crate::storage::ImageStore;
use admin::admin_api_router;
use public::{public_api_router, storage::storage_router};
use user::user_api_router;

/// Shared handles every router needs.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Arc<DatabaseConnection>,
    pub store: ImageStore,
    pub keys: TokenKeys,
}

pub fn create_api_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .merge(public_api_router(ctx.clone()))
        .merge(user_api_router(ctx.clone()))
        .nest("/admin", admin_api_router(ctx.clone()));

    Router::new()
        .nest("/api", api)
        .merge(storage_router(ctx.store))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}
