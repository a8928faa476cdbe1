//! In-memory entity stores guarded by one reader/writer lock per entity kind.

use super::{MediaStore, UserStore};
use crate::{
    errors::AppError,
    models::{
        Media, User,
        user::{NewUser, UserId},
    },
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

struct UserTable {
    users: BTreeMap<UserId, User>,
    next_id: UserId,
}

/// Users keyed by a store-assigned, strictly increasing id starting at 1.
pub struct InMemoryUserStore {
    inner: RwLock<UserTable>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(UserTable {
                users: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// A store pre-populated with three demo accounts.
    pub fn with_demo_users() -> Self {
        let demo = [
            ("John Doe", "john@example.com", 30),
            ("Jane Smith", "jane@example.com", 28),
            ("Bob Johnson", "bob@example.com", 35),
        ];

        let mut table = UserTable {
            users: BTreeMap::new(),
            next_id: 1,
        };
        for (name, email, age) in demo {
            let user = NewUser {
                name: name.into(),
                email: email.into(),
                age,
            }
            .into_user(table.next_id);
            table.users.insert(user.id, user);
            table.next_id += 1;
        }

        Self {
            inner: RwLock::new(table),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut table = self.inner.write().await;
        let user = user.into_user(table.next_id);
        table.users.insert(user.id, user.clone());
        table.next_id += 1;
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<User, AppError> {
        let table = self.inner.read().await;
        table
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let table = self.inner.read().await;
        Ok(table.users.values().cloned().collect())
    }

    async fn update(&self, user: User) -> Result<User, AppError> {
        let mut table = self.inner.write().await;
        match table.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(AppError::not_found("user not found")),
        }
    }

    async fn delete(&self, id: UserId) -> Result<(), AppError> {
        let mut table = self.inner.write().await;
        table
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("user not found"))
    }
}

/// Media metadata keyed by its UUID.
#[derive(Default)]
pub struct InMemoryMediaStore {
    media: RwLock<HashMap<Uuid, Media>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn save(&self, media: Media) -> Result<(), AppError> {
        if media.id.is_nil() {
            return Err(AppError::bad_request("media ID is required"));
        }
        self.media.write().await.insert(media.id, media);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Media, AppError> {
        self.media
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found("media not found"))
    }

    async fn list(&self) -> Result<Vec<Media>, AppError> {
        let mut all: Vec<Media> = self.media.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.media
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("media not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::ErrorKind, models::MediaKind};
    use chrono::{Duration, Utc};

    fn new_user(name: &str) -> NewUser {
        NewUser {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            age: 40,
        }
    }

    fn media_at(offset_secs: i64) -> Media {
        Media {
            id: Uuid::new_v4(),
            original_name: "a.png".into(),
            stored_name: "x_1.jpg".into(),
            kind: MediaKind::Image,
            format: "jpg".into(),
            size_bytes: 10,
            file_path: "uploads/x_1.jpg".into(),
            uploaded_at: Utc::now() + Duration::seconds(offset_secs),
            width: Some(1),
            height: Some(1),
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let store = InMemoryUserStore::new();
        let first = store.create(new_user("Ann")).await.unwrap();
        let second = store.create(new_user("Ben")).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        store.delete(first.id).await.unwrap();
        let third = store.create(new_user("Cid")).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn demo_users_are_seeded_in_order() {
        let store = InMemoryUserStore::with_demo_users();
        let users = store.list().await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["John Doe", "Jane Smith", "Bob Johnson"]);

        let next = store.create(new_user("Dee")).await.unwrap();
        assert_eq!(next.id, 4);
    }

    #[tokio::test]
    async fn update_and_delete_missing_user_are_not_found() {
        let store = InMemoryUserStore::new();
        let ghost = new_user("Ghost").into_user(42);

        let err = store.update(ghost).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = store.delete(42).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn update_overwrites_fields() {
        let store = InMemoryUserStore::new();
        let mut user = store.create(new_user("Ann")).await.unwrap();
        user.name = "Annie".into();
        user.age = 23;
        store.update(user.clone()).await.unwrap();
        assert_eq!(store.get(user.id).await.unwrap(), user);
    }

    #[tokio::test]
    async fn media_save_rejects_nil_id() {
        let store = InMemoryMediaStore::new();
        let mut media = media_at(0);
        media.id = Uuid::nil();
        let err = store.save(media).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn media_list_is_ordered_by_upload_time() {
        let store = InMemoryMediaStore::new();
        let late = media_at(10);
        let early = media_at(-10);
        store.save(late.clone()).await.unwrap();
        store.save(early.clone()).await.unwrap();

        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);

        store.delete(early.id).await.unwrap();
        let err = store.get(early.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
