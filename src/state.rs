//! Shared application state: the services every handler and middleware is
//! wired against.

use crate::{
    config::AppConfig,
    errors::AppError,
    models::{Media, User},
    services::{media_service::MediaService, spool::UploadSpool, user_service::UserService},
    store::{EntityLookup, InMemoryMediaStore, InMemoryUserStore, MediaStore, UserStore},
};
use async_trait::async_trait;
use std::{io, path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub media: MediaService,
    pub spool: UploadSpool,
}

impl AppState {
    /// Wire services over the given stores, creating the media root and the
    /// upload spool on disk.
    pub async fn new(
        user_store: Arc<dyn UserStore>,
        media_store: Arc<dyn MediaStore>,
        media_dir: impl Into<PathBuf>,
        spool_dir: impl Into<PathBuf>,
    ) -> io::Result<Self> {
        Ok(Self {
            users: UserService::new(user_store),
            media: MediaService::new(media_store, media_dir).await?,
            spool: UploadSpool::new(spool_dir).await?,
        })
    }

    /// Build the in-memory deployment described by `cfg`.
    pub async fn from_config(cfg: &AppConfig) -> io::Result<Self> {
        let users: Arc<dyn UserStore> = if cfg.seed_demo_users {
            Arc::new(InMemoryUserStore::with_demo_users())
        } else {
            Arc::new(InMemoryUserStore::new())
        };
        Self::new(
            users,
            Arc::new(InMemoryMediaStore::new()),
            cfg.media_dir.clone(),
            cfg.spool_dir.clone(),
        )
        .await
    }
}

#[async_trait]
impl EntityLookup<User> for AppState {
    async fn lookup(&self, id: &i64, cancel: &CancellationToken) -> Result<User, AppError> {
        self.users.get_user(*id, cancel).await
    }
}

#[async_trait]
impl EntityLookup<Media> for AppState {
    async fn lookup(&self, id: &Uuid, cancel: &CancellationToken) -> Result<Media, AppError> {
        self.media.get_media(*id, cancel).await
    }
}
