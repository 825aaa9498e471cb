use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{error, info, warn};

/// Message of the error a response was built from, left for [`logging_middleware`].
#[derive(Clone, Debug)]
pub struct ErrorTrace(pub String);

/// One event per request: `error!` for 5xx, `warn!` for other failures, `info!` otherwise.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match response.extensions().get::<ErrorTrace>() {
        Some(ErrorTrace(cause)) if response.status().is_server_error() => {
            error!(%method, %path, status, elapsed_ms, error = %cause, "Request failed")
        }
        Some(ErrorTrace(cause)) => {
            warn!(%method, %path, status, elapsed_ms, error = %cause, "Request rejected")
        }
        None => info!(%method, %path, status, elapsed_ms, "Request handled"),
    }

    response
}
