//! Entity store seams.
//!
//! Callers only see the [`UserStore`] and [`MediaStore`] traits; the in-memory
//! implementations in [`memory`] can be swapped for a persistent backend
//! without touching services or middleware.

pub mod memory;

use crate::{
    errors::AppError,
    models::{
        Entity, Media, User,
        user::{NewUser, UserId},
    },
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use memory::{InMemoryMediaStore, InMemoryUserStore};

/// Key-based CRUD over users. Missing keys yield `NotFound`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user, assigning the next identifier.
    async fn create(&self, user: NewUser) -> Result<User, AppError>;
    async fn get(&self, id: UserId) -> Result<User, AppError>;
    async fn list(&self) -> Result<Vec<User>, AppError>;
    /// Overwrite an existing user in place.
    async fn update(&self, user: User) -> Result<User, AppError>;
    async fn delete(&self, id: UserId) -> Result<(), AppError>;
}

/// Key-based CRUD over media metadata. Missing keys yield `NotFound`.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn save(&self, media: Media) -> Result<(), AppError>;
    async fn get(&self, id: Uuid) -> Result<Media, AppError>;
    async fn list(&self) -> Result<Vec<Media>, AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

/// Lookup capability used by the entity-load middleware.
#[async_trait]
pub trait EntityLookup<E: Entity>: Send + Sync {
    async fn lookup(&self, id: &E::Id, cancel: &CancellationToken) -> Result<E, AppError>;
}
