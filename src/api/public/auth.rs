use axum::{
    extract::Extension, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::auth::TokenKeys;
use crate::services::account::{self, Credentials};

//ROUTERS
pub fn auth_router(db: Arc<DatabaseConnection>, keys: TokenKeys) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .layer(Extension(db))
        .layer(Extension(keys))
}

//ROUTES
async fn register(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let created = account::register(&db, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": created.id,
            "username": created.username,
            "role": created.role,
        })),
    ))
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(keys): Extension<TokenKeys>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    let token = account::login(&db, &keys, &payload.username, &payload.password).await?;
    Ok(Json(json!({ "token": token })))
}

//STRUCTS
#[derive(Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}
