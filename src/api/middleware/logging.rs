use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Logs one line per request. Server errors are logged at `warn`.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let content_length = request
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::warn!(%method, %path, status, duration_ms, content_length, "request failed");
    } else {
        tracing::info!(%method, %path, status, duration_ms, content_length, "request completed");
    }

    response
}
