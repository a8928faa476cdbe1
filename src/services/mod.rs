//! Service layer: validation and orchestration between handlers and stores.

pub mod media_processing;
pub mod media_service;
pub mod spool;
pub mod user_service;

use crate::errors::AppError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Cause attached to the Internal error returned for an abandoned request.
#[derive(Debug, Error)]
#[error("request was cancelled")]
pub struct Cancelled;

/// Fail fast when the calling request has already gone away.
pub(crate) fn ensure_active(cancel: &CancellationToken) -> Result<(), AppError> {
    if cancel.is_cancelled() {
        return Err(AppError::internal_with("context cancelled", Cancelled));
    }
    Ok(())
}
