//! Per-prefix HTTP middleware.

use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

/// Header carrying the handling duration when a prefix has timing enabled.
pub const X_RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time");

pub async fn response_time(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms:.3}ms")) {
        response.headers_mut().insert(X_RESPONSE_TIME, value);
    }
    response
}
