//! Represents a user account held by the entity store.

use serde::{Deserialize, Serialize};

/// Store-assigned user identifier. Always positive once assigned.
pub type UserId = i64;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// Assigned by the store on creation, immutable afterwards.
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub age: i32,
}

/// Body of `POST /users`.
#[derive(Deserialize, Clone, Debug)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub age: i32,
}

/// Body of `PUT /users/{id}`. All fields are overwritten.
#[derive(Deserialize, Clone, Debug)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub age: i32,
}

/// A user that has not been assigned an identifier yet.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: i32,
}

impl NewUser {
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            age: self.age,
        }
    }
}
