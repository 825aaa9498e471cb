pub mod category;
pub mod product;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    middleware::from_fn_with_state,
    Router,
};

use super::ApiContext;
use crate::entities::user::Role;
use crate::error::AppError;
use crate::middleware::auth::{auth_middleware, AuthState};
use crate::storage::ImageUpload;
use category::admin_category_router;
use product::admin_product_router;

/// Most images accepted by one gallery upload.
pub const MAX_GALLERY_BATCH: usize = 10;

pub fn admin_api_router(ctx: ApiContext) -> Router {
    //oversized files are rejected per field by the store, not by the body limit
    let body_limit = ctx
        .store
        .max_bytes()
        .saturating_mul(MAX_GALLERY_BATCH)
        .saturating_add(64 * 1024);

    Router::new()
        .merge(admin_category_router(ctx.db.clone(), ctx.store.clone()))
        .merge(admin_product_router(ctx.db.clone(), ctx.store.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(from_fn_with_state(
            AuthState {
                db: ctx.db,
                keys: ctx.keys,
                role: Some(Role::Admin),
            },
            auth_middleware,
        ))
}

/// Collects every file sent under `field` (or `field[]`), in upload order.
/// Other parts are ignored.
pub(crate) async fn read_images(
    mut multipart: Multipart,
    field: &str,
) -> Result<Vec<ImageUpload>, AppError> {
    let array_field = format!("{field}[]");
    let mut uploads = Vec::new();

    while let Some(part) = multipart.next_field().await? {
        let name = part.name().unwrap_or_default();
        if name != field && name != array_field {
            continue;
        }

        let content_type = match part.content_type() {
            Some(content_type) => content_type.to_owned(),
            None => part
                .file_name()
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .unwrap_or_default()
                .to_owned(),
        };
        let bytes = part.bytes().await?;
        uploads.push(ImageUpload {
            content_type,
            bytes,
        });
    }

    Ok(uploads)
}
