use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use super::{read_images, MAX_GALLERY_BATCH};
use crate::api::public::product::ProductQuery;
use crate::error::AppError;
use crate::services::{
    catalog::{self, CatalogScope},
    product::{self, CreateProduct, UpdateProduct},
};
use crate::storage::ImageStore;

//ROUTERS
pub fn admin_product_router(db: Arc<DatabaseConnection>, store: ImageStore) -> Router {
    Router::new()
        .route("/products", get(get_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).patch(patch_product).delete(delete_product),
        )
        .route("/products/:id/image", post(upload_image))
        .route("/products/:id/gallery", post(upload_gallery))
        .route("/products/:id/gallery/:index", delete(delete_gallery_image))
        .layer(Extension(db))
        .layer(Extension(store))
}

//ROUTES
async fn get_products(
    Query(params): Query<ProductQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, AppError> {
    let page =
        catalog::list_products(db.as_ref(), CatalogScope::Admin, &params.into_criteria()).await?;
    Ok(Json(page))
}

async fn get_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(product::get(db.as_ref(), id).await?))
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateProduct>,
) -> Result<impl IntoResponse, AppError> {
    let created = product::create(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn patch_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<UpdateProduct>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(product::update(&db, id, payload).await?))
}

async fn delete_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(store): Extension<ImageStore>,
) -> Result<impl IntoResponse, AppError> {
    product::delete(&db, &store, id).await?;
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

    Ok(Json(product::replace_image(&db, &store, id, upload).await?))
}

async fn upload_gallery(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(store): Extension<ImageStore>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let uploads = read_images(multipart, "images").await?;
    if uploads.len() > MAX_GALLERY_BATCH {
        return Err(AppError::invalid(
            "images",
            format!("at most {MAX_GALLERY_BATCH} images per upload"),
        ));
    }

    Ok(Json(
        product::add_gallery_images(&db, &store, id, uploads).await?,
    ))
}

async fn delete_gallery_image(
    Path((id, index)): Path<(i32, usize)>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(store): Extension<ImageStore>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        product::remove_gallery_image(&db, &store, id, index).await?,
    ))
}
