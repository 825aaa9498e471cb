use axum::{
    extract::{Extension, Multipart, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use super::read_images;
use crate::error::AppError;
use crate::services::category::{self, CreateCategory, UpdateCategory};
use crate::storage::ImageStore;

//ROUTERS
pub fn admin_category_router(db: Arc<DatabaseConnection>, store: ImageStore) -> Router {
    Router::new()
        .route("/categories", get(get_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category)
                .patch(patch_category)
                .delete(delete_category),
        )
        .route("/categories/:id/image", post(upload_image))
        .layer(Extension(db))
        .layer(Extension(store))
}

//ROUTES
async fn get_categories(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(category::list_all(db.as_ref()).await?))
}

async fn get_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(category::get(db.as_ref(), id).await?))
}

async fn create_category(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateCategory>,
) -> Result<impl IntoResponse, AppError> {
    let created = category::create(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn patch_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<UpdateCategory>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(category::update(&db, id, payload).await?))
}

async fn delete_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(store): Extension<ImageStore>,
) -> Result<impl IntoResponse, AppError> {
    category::delete(&db, &store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_image(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(store): Extension<ImageStore>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_images(multipart, "image")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::invalid("image", "is required"))?;

    Ok(Json(category::replace_image(&db, &store, id, upload).await?))
}
