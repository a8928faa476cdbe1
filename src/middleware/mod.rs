//! Request interceptors.
//!
//! - [`logging`]: global access log plus the per-request cancellation token
//! - [`auth`]: presence-only `Authorization` check on API routes
//! - [`request_context`]: route-scoped id validation and entity loading

pub mod auth;
pub mod logging;
pub mod request_context;
