//! Presence-only authorization check.
//!
//! Any non-empty `Authorization` header is accepted; no token is verified.

use axum::{
    Json,
    extract::Request,
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

pub async fn require_authorization(request: Request, next: Next) -> Response {
    let present = request
        .headers()
        .get(AUTHORIZATION)
        .is_some_and(|value| !value.as_bytes().trim_ascii().is_empty());

    if !present {
        debug!(path = %request.uri().path(), "rejecting request without authorization header");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Missing authorization header" })),
        )
            .into_response();
    }

    next.run(request).await
}
