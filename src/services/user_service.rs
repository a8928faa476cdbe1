use super::ensure_active;
use crate::{
    errors::{AppError, ErrorKind},
    models::{
        User,
        user::{CreateUserRequest, NewUser, UpdateUserRequest, UserId},
    },
    store::UserStore,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Validation and orchestration for user accounts.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn create_user(
        &self,
        req: CreateUserRequest,
        cancel: &CancellationToken,
    ) -> Result<User, AppError> {
        ensure_active(cancel)?;
        require_name_and_email(&req.name, &req.email)?;

        let user = self
            .store
            .create(NewUser {
                name: req.name,
                email: req.email,
                age: req.age,
            })
            .await
            .map_err(|err| {
                error!(error = %err, "failed to create user");
                AppError::internal_with("failed to create user", err)
            })?;

        info!(user_id = user.id, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId, cancel: &CancellationToken) -> Result<User, AppError> {
        ensure_active(cancel)?;
        require_positive(id)?;
        self.store.get(id).await
    }

    pub async fn list_users(&self, cancel: &CancellationToken) -> Result<Vec<User>, AppError> {
        ensure_active(cancel)?;
        self.store.list().await.map_err(|err| {
            error!(error = %err, "failed to list users");
            AppError::internal_with("failed to retrieve users", err)
        })
    }

    /// Overwrite name, email and age of an existing user.
    pub async fn update_user(
        &self,
        id: UserId,
        req: UpdateUserRequest,
        cancel: &CancellationToken,
    ) -> Result<User, AppError> {
        ensure_active(cancel)?;
        require_positive(id)?;
        require_name_and_email(&req.name, &req.email)?;

        let user = User {
            id,
            name: req.name,
            email: req.email,
            age: req.age,
        };
        let updated = self.store.update(user).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                return err;
            }
            error!(user_id = id, error = %err, "failed to update user");
            AppError::internal_with("failed to update user", err)
        })?;

        info!(user_id = id, "user updated");
        Ok(updated)
    }

    pub async fn delete_user(&self, id: UserId, cancel: &CancellationToken) -> Result<(), AppError> {
        ensure_active(cancel)?;
        require_positive(id)?;
        self.store.delete(id).await?;
        info!(user_id = id, "user deleted");
        Ok(())
    }
}

fn require_positive(id: UserId) -> Result<(), AppError> {
    if id <= 0 {
        return Err(AppError::invalid_id("user id must be positive"));
    }
    Ok(())
}

fn require_name_and_email(name: &str, email: &str) -> Result<(), AppError> {
    if name.trim().is_empty() || email.trim().is_empty() {
        return Err(AppError::bad_request("name and email are required"));
    }
    Ok(())
}
