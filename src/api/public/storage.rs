use axum::{
    body::Body,
    extract::{Extension, Path},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::io::ErrorKind;
use tokio_util::io::ReaderStream;

use crate::error::AppError;
use crate::storage::ImageStore;

pub fn storage_router(store: ImageStore) -> Router {
    Router::new()
        .route("/storage/*path", get(serve_image))
        .layer(Extension(store))
}

/// Streams a stored image back with a content type guessed from its extension.
async fn serve_image(
    Path(path): Path<String>,
    Extension(store): Extension<ImageStore>,
) -> Result<impl IntoResponse, AppError> {
    let full_path = store
        .resolve(&path)
        .ok_or_else(|| AppError::not_found(format!("Image `{path}`")))?;

    let file = match tokio::fs::File::open(&full_path).await {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(AppError::not_found(format!("Image `{path}`")));
        }
        Err(err) => {
            return Err(AppError::Storage(format!("Failed to open {path}: {err}")));
        }
    };

    let content_type = mime_guess::from_path(&full_path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("inline"),
    );

    Ok((headers, Body::from_stream(ReaderStream::new(file))))
}
