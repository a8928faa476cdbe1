//! Handlers for the `/users` resource family.
//!
//! Routes carrying `{id}` run behind the request-context chain, so the
//! handlers below read the validated id or the preloaded user instead of
//! touching the path themselves.

use super::json_body;
use crate::{
    errors::AppError,
    middleware::{
        logging::RequestCancellation,
        request_context::{Loaded, ScopedId},
    },
    models::{
        User,
        user::{CreateUserRequest, UpdateUserRequest},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

/// `POST /users`
pub async fn create_user(
    State(state): State<AppState>,
    RequestCancellation(cancel): RequestCancellation,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let req = json_body(body)?;
    let user = state.users.create_user(req, &cancel).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users`
pub async fn list_users(
    State(state): State<AppState>,
    RequestCancellation(cancel): RequestCancellation,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list_users(&cancel).await?))
}

/// `GET /users/{id}`
pub async fn get_user(Loaded(user): Loaded<User>) -> Json<User> {
    Json(user)
}

/// `PUT /users/{id}`
pub async fn update_user(
    State(state): State<AppState>,
    RequestCancellation(cancel): RequestCancellation,
    ScopedId(id): ScopedId<User>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let req = json_body(body)?;
    Ok(Json(state.users.update_user(id, req, &cancel).await?))
}

/// `DELETE /users/{id}`
pub async fn delete_user(
    State(state): State<AppState>,
    RequestCancellation(cancel): RequestCancellation,
    ScopedId(id): ScopedId<User>,
) -> Result<StatusCode, AppError> {
    state.users.delete_user(id, &cancel).await?;
    Ok(StatusCode::NO_CONTENT)
}
