use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{error::Error as StdError, fmt};

/// Boxed cause carried by an [`AppError`] for server-side diagnostics.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The closed set of error classes every boundary-crossing failure maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Internal,
    InvalidId,
    FileTooLarge,
    UnsupportedType,
}

impl ErrorKind {
    /// Machine-readable code for this kind.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Internal => "INTERNAL_ERROR",
            ErrorKind::InvalidId => "INVALID_ID",
            ErrorKind::FileTooLarge => "FILE_TOO_LARGE",
            ErrorKind::UnsupportedType => "UNSUPPORTED_TYPE",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::BadRequest | ErrorKind::InvalidId | ErrorKind::UnsupportedType => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified application error: kind, client-facing message and an
/// optional underlying cause that is only ever logged.
#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    source: Option<BoxError>,
}

impl AppError {
    /// Create a new AppError of the given kind.
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            source: None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }

    /// Shortcut for a 500 that keeps the underlying cause for logging.
    pub fn internal_with(msg: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::internal(msg).with_source(cause)
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidId, msg)
    }

    pub fn file_too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileTooLarge, msg)
    }

    pub fn unsupported_type(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedType, msg)
    }

    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        self.source = Some(cause.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> StatusCode {
        status_for(Some(self.kind))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(cause) => write!(f, "[{}] {}: {}", self.kind, self.message, cause),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Recover the classified kind from any error, looking through wrappers.
///
/// Returns `None` when no [`AppError`] appears anywhere in the source chain.
pub fn classify(err: &(dyn StdError + 'static)) -> Option<ErrorKind> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(app) = e.downcast_ref::<AppError>() {
            return Some(app.kind);
        }
        current = e.source();
    }
    None
}

/// The one status mapping used by every handler; unclassified errors are 500s.
pub fn status_for(kind: Option<ErrorKind>) -> StatusCode {
    kind.map(ErrorKind::status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.kind == ErrorKind::Internal {
            let cause_kind = self.source.as_deref().and_then(|cause| classify(cause));
            tracing::error!(code = self.kind.code(), ?cause_kind, error = %self, "request failed");
        } else {
            tracing::debug!(code = self.kind.code(), error = %self, "request rejected");
        }

        let body = Json(json!({ "error": self.message() }));
        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => AppError::internal("internal server error").with_source(other),
        }
    }
}
