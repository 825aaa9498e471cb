use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::services::{
    catalog::{self, CatalogScope, ProductCriteria, SortKey},
    similar,
};

//ROUTERS
pub fn product_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/products", get(get_products))
        .route("/products/featured", get(get_featured))
        //`:product` is a slug on the detail route and an id on `similar`
        .route("/products/:product", get(get_product))
        .route("/products/:product/similar", get(get_similar))
        .layer(Extension(db))
}

//ROUTES
async fn get_products(
    Query(params): Query<ProductQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, AppError> {
    let page =
        catalog::list_products(db.as_ref(), CatalogScope::Storefront, &params.into_criteria())
            .await?;
    Ok(Json(page))
}

async fn get_featured(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog::featured(db.as_ref()).await?))
}

async fn get_product(
    Path(slug): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog::find_by_slug(db.as_ref(), &slug).await?))
}

async fn get_similar(
    Path(id): Path<i32>,
    Query(params): Query<SimilarQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(similar::similar_to(db.as_ref(), id, params.limit).await?))
}

//STRUCTS
#[derive(Deserialize, Debug, Default)]
pub(crate) struct ProductQuery {
    search: Option<String>,
    #[serde(alias = "category")]
    category_id: Option<i32>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    featured: Option<bool>,
    active: Option<bool>,
    sort: Option<String>,
    page: Option<i64>,
    per_page: Option<i64>,
}

impl ProductQuery {
    pub(crate) fn into_criteria(self) -> ProductCriteria {
        ProductCriteria {
            sort: SortKey::parse(self.sort.as_deref()),
            search: self.search,
            category_id: self.category_id,
            min_price: self.min_price,
            max_price: self.max_price,
            featured: self.featured,
            active: self.active,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Deserialize, Debug)]
struct SimilarQuery {
    limit: Option<u64>,
}
