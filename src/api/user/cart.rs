use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::services::cart::{self, Direction};

//ROUTERS
pub fn cart_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/cart", get(get_cart).post(add_product))
        .route("/cart/:id", patch(patch_entry).delete(remove_product))
        .layer(Extension(db))
}

//ROUTES
async fn get_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    user: Option<Extension<CurrentUser>>,
) -> Result<impl IntoResponse, AppError> {
    let lines = cart::list_items(db.as_ref(), user.map(|Extension(user)| user)).await?;
    Ok(Json(lines))
}

async fn add_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    user: Option<Extension<CurrentUser>>,
    Json(payload): Json<AddProduct>,
) -> Result<impl IntoResponse, AppError> {
    let line = cart::add_to_cart(
        &db,
        user.map(|Extension(user)| user),
        payload.product_id,
        payload.quantity,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(line)))
}

async fn patch_entry(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    user: Option<Extension<CurrentUser>>,
    Json(payload): Json<PatchEntry>,
) -> Result<impl IntoResponse, AppError> {
    let user = user.map(|Extension(user)| user);
    let line = match payload {
        PatchEntry {
            direction: Some(direction),
            quantity: None,
        } => cart::update_quantity(&db, user, id, direction).await?,
        PatchEntry {
            direction: None,
            quantity: Some(quantity),
        } => cart::set_quantity(&db, user, id, quantity).await?,
        _ => {
            return Err(AppError::invalid(
                "direction",
                "send exactly one of `direction` or `quantity`",
            ))
        }
    };
    Ok(Json(line))
}

async fn remove_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    user: Option<Extension<CurrentUser>>,
) -> Result<impl IntoResponse, AppError> {
    cart::remove_item(&db, user.map(|Extension(user)| user), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//STRUCTS
#[derive(Deserialize, Debug)]
struct AddProduct {
    product_id: i32,
    quantity: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct PatchEntry {
    direction: Option<Direction>,
    quantity: Option<i64>,
}
