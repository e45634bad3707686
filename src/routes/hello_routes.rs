//! Sample endpoints of the demo host.

use axum::{Router, extract::Path, http::StatusCode, routing::get};

pub fn routes() -> Router {
    Router::new()
        .route("/hello", get(hello))
        .route("/status/:code", get(status))
}

async fn hello() -> &'static str {
    "Hello, world!"
}

/// Answers with the requested status code, 400 if it is not a valid one.
async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}
