use axum::{
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{Method, StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use std::{convert::Infallible, net::SocketAddr, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancellation token tied to the lifetime of one request.
///
/// Cancelled by [`log_requests`] when the request future is dropped before
/// a response was produced (client gone, timeout, panic). Extracting it
/// without the middleware installed yields a fresh, never-cancelled token.
#[derive(Clone, Debug, Default)]
pub struct RequestCancellation(pub CancellationToken);

impl<S> FromRequestParts<S> for RequestCancellation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestCancellation>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Logs method, path and origin on entry and status plus duration on exit.
pub async fn log_requests(mut request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let origin = request_origin(&request);

    let cancel = CancellationToken::new();
    request
        .extensions_mut()
        .insert(RequestCancellation(cancel.clone()));

    info!(%method, %path, %origin, "request started");
    let mut guard = CompletionGuard {
        method,
        path,
        started: Instant::now(),
        status: None,
        cancel,
    };

    let response = next.run(request).await;
    guard.status = Some(response.status());
    response
}

/// First `X-Forwarded-For` hop, else the peer address, else `unknown`.
fn request_origin(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or("").trim().to_string())
        .filter(|s| !s.is_empty());
    let peer = || {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
    };
    forwarded
        .or_else(peer)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Emits the completion line when dropped, so it also fires for requests
/// that never produced a response.
struct CompletionGuard {
    method: Method,
    path: String,
    started: Instant,
    status: Option<StatusCode>,
    cancel: CancellationToken,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        match self.status {
            Some(status) => info!(
                method = %self.method,
                path = %self.path,
                status = status.as_u16(),
                elapsed_ms,
                "request completed"
            ),
            None => {
                self.cancel.cancel();
                warn!(
                    method = %self.method,
                    path = %self.path,
                    elapsed_ms,
                    "request aborted before completion"
                );
            }
        }
    }
}
