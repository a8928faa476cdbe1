//! Route-scoped request context: validate the `{id}` path segment, then
//! load the matching entity.
//!
//! Both stages share one typed [`RequestScope`] stored in the request
//! extensions. Handlers read it through the [`ScopedId`] and [`Loaded`]
//! extractors and never re-parse or re-fetch.
//!
//! Apply with `route_layer`, load first and validate last, so validation
//! runs outermost:
//!
//! ```ignore
//! .route_layer(from_fn_with_state(state, load_entity::<User, AppState>))
//! .route_layer(from_fn(validate_id::<User>))
//! ```

use super::logging::RequestCancellation;
use crate::{errors::AppError, models::Entity, store::EntityLookup};
use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use tracing::debug;

/// Per-request context for entity `E`.
#[derive(Clone, Debug)]
pub struct RequestScope<E: Entity> {
    pub id: E::Id,
    pub entity: Option<E>,
}

/// Parse the `id` path segment into `E::Id` and record it in the request scope.
pub async fn validate_id<E: Entity>(
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let raw = params
        .get("id")
        .ok_or_else(|| AppError::internal("route has no id segment"))?;
    let id = raw.parse::<E::Id>().map_err(|_| {
        debug!(raw = %raw, entity = E::NAME, "rejecting malformed id");
        AppError::invalid_id(format!("invalid {} id format", E::NAME))
    })?;

    request
        .extensions_mut()
        .insert(RequestScope::<E> { id, entity: None });
    Ok(next.run(request).await)
}

/// Look up the entity whose id [`validate_id`] recorded.
pub async fn load_entity<E, S>(
    State(lookup): State<S>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    E: Entity,
    S: EntityLookup<E>,
{
    let id = request
        .extensions()
        .get::<RequestScope<E>>()
        .map(|scope| scope.id.clone())
        .ok_or_else(|| AppError::internal(format!("{} id missing from request scope", E::NAME)))?;

    let RequestCancellation(cancel) = request
        .extensions()
        .get::<RequestCancellation>()
        .cloned()
        .unwrap_or_default();

    let entity = lookup.lookup(&id, &cancel).await?;
    request.extensions_mut().insert(RequestScope {
        id,
        entity: Some(entity),
    });
    Ok(next.run(request).await)
}

/// The validated path id.
pub struct ScopedId<E: Entity>(pub E::Id);

impl<E, S> FromRequestParts<S> for ScopedId<E>
where
    E: Entity,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestScope<E>>()
            .map(|scope| ScopedId(scope.id.clone()))
            .ok_or_else(|| AppError::internal(format!("{} id missing from request scope", E::NAME)))
    }
}

/// The entity preloaded for this request.
pub struct Loaded<E: Entity>(pub E);

impl<E, S> FromRequestParts<S> for Loaded<E>
where
    E: Entity,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestScope<E>>()
            .and_then(|scope| scope.entity.clone())
            .map(Loaded)
            .ok_or_else(|| AppError::internal(format!("{} missing from request scope", E::NAME)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use async_trait::async_trait;
    use axum::{
        Json, Router,
        body::Body,
        http::StatusCode,
        middleware::{from_fn, from_fn_with_state},
        routing::get,
    };
    use http_body_util::BodyExt;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    #[derive(Clone, Default)]
    struct CountingLookup {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EntityLookup<User> for CountingLookup {
        async fn lookup(&self, id: &i64, _cancel: &CancellationToken) -> Result<User, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *id == 7 {
                Ok(User {
                    id: 7,
                    name: "Ann".into(),
                    email: "a@x.com".into(),
                    age: 22,
                })
            } else {
                Err(AppError::not_found("user not found"))
            }
        }
    }

    fn chained(lookup: CountingLookup) -> Router {
        Router::new()
            .route(
                "/users/{id}",
                get(|Loaded(user): Loaded<User>| async move { Json(user) }),
            )
            .route_layer(from_fn_with_state(lookup, load_entity::<User, CountingLookup>))
            .route_layer(from_fn(validate_id::<User>))
    }

    async fn get_status(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[tokio::test]
    async fn malformed_id_short_circuits_before_lookup() {
        let lookup = CountingLookup::default();
        let (status, body) = get_status(chained(lookup.clone()), "/users/abc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid user id format");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn padded_id_is_rejected() {
        let lookup = CountingLookup::default();
        for uri in ["/users/%207", "/users/7%20"] {
            let (status, body) = get_status(chained(lookup.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "invalid user id format");
        }
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let lookup = CountingLookup::default();
        let (status, _) = get_status(chained(lookup.clone()), "/users/8").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn loaded_entity_reaches_handler() {
        let (status, body) = get_status(chained(CountingLookup::default()), "/users/7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ann");
    }

    #[tokio::test]
    async fn load_without_validation_is_internal() {
        let app = Router::new()
            .route(
                "/users/{id}",
                get(|Loaded(user): Loaded<User>| async move { Json(user) }),
            )
            .route_layer(from_fn_with_state(
                CountingLookup::default(),
                load_entity::<User, CountingLookup>,
            ));

        let (status, _) = get_status(app, "/users/7").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn handler_without_chain_is_internal() {
        let app = Router::new().route(
            "/users/{id}",
            get(|ScopedId(id): ScopedId<User>| async move { id.to_string() }),
        );
        let (status, _) = get_status(app, "/users/7").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
