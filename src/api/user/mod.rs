pub mod cart;

use axum::{middleware::from_fn_with_state, Router};

use super::ApiContext;
use crate::middleware::auth::{auth_middleware, AuthState};
use cart::cart_router;

/// Routes for any signed-in account, whatever its role.
pub fn user_api_router(ctx: ApiContext) -> Router {
    Router::new()
        .merge(cart_router(ctx.db.clone()))
        .route_layer(from_fn_with_state(
            AuthState {
                db: ctx.db,
                keys: ctx.keys,
                role: None,
            },
            auth_middleware,
        ))
}
