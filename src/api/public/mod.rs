pub mod auth;
pub mod category;
pub mod product;
pub mod storage;

use axum::Router;

use super::ApiContext;
use auth::auth_router;
use category::category_router;
use product::product_router;

pub fn public_api_router(ctx: ApiContext) -> Router {
    Router::new()
        .merge(auth_router(ctx.db.clone(), ctx.keys.clone()))
        .merge(category_router(ctx.db.clone()))
        .merge(product_router(ctx.db))
}
