pub mod health_handlers;
pub mod media_handlers;
pub mod user_handlers;

use crate::errors::AppError;
use axum::{Json, extract::rejection::JsonRejection};

/// Unwrap a JSON body, folding any rejection into a BadRequest.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request("invalid request body").with_source(rejection))
}
