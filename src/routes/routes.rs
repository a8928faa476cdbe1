//! Defines routes for the user and media resource families.
//!
//! ## Structure
//! - **Users**
//!   - `POST   /users`        - create user
//!   - `GET    /users`        - list users
//!   - `GET    /users/{id}`   - fetch user (preloaded by the context chain)
//!   - `PUT    /users/{id}`   - overwrite name/email/age
//!   - `DELETE /users/{id}`   - delete user
//!
//! - **Media**
//!   - `POST   /media/upload`        - multipart upload (field `file`)
//!   - `GET    /media`               - list media
//!   - `GET    /media/{id}`          - fetch media record
//!   - `GET    /media/{id}/download` - stream stored payload
//!   - `DELETE /media/{id}`          - delete payload and record
//!
//! - **Probes** (no authorization): `GET /healthz`, `GET /readyz`
//!
//! Every `{id}` route runs `validate_id` then `load_entity` before its handler.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        media_handlers::{delete_media, download_media, get_media, list_media, upload_media},
        user_handlers::{create_user, delete_user, get_user, list_users, update_user},
    },
    middleware::{
        auth::require_authorization,
        logging::log_requests,
        request_context::{load_entity, validate_id},
    },
    models::{Media, User},
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

/// Transport limits applied by the router.
#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    /// Requests still running after this long are answered with 408.
    pub request_timeout: Duration,
    /// Largest accepted upload request body.
    pub max_request_bytes: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            max_request_bytes: 300 * 1024 * 1024,
        }
    }
}

/// Build the application router with all layers and state attached.
pub fn routes(state: AppState, limits: HttpLimits) -> Router {
    let users = Router::new().route("/users", post(create_user).get(list_users));

    let user_item = Router::new()
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            load_entity::<User, AppState>,
        ))
        .route_layer(from_fn(validate_id::<User>));

    let media = Router::new().route("/media", get(list_media)).route(
        "/media/upload",
        post(upload_media).layer(DefaultBodyLimit::max(limits.max_request_bytes)),
    );

    let media_item = Router::new()
        .route("/media/{id}", get(get_media).delete(delete_media))
        .route("/media/{id}/download", get(download_media))
        .route_layer(from_fn_with_state(
            state.clone(),
            load_entity::<Media, AppState>,
        ))
        .route_layer(from_fn(validate_id::<Media>));

    let api = users
        .merge(user_item)
        .merge(media)
        .merge(media_item)
        .layer(from_fn(require_authorization));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .merge(api)
        .layer(from_fn(log_requests))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            limits.request_timeout,
        ))
        .with_state(state)
}
