//! Core data models for the user and media service.
//!
//! Both entity kinds serialize naturally as JSON via `serde` and are owned by
//! the entity store; handlers only ever hold per-request copies.

pub mod media;
pub mod user;

use std::{fmt, str::FromStr};

pub use media::{Media, MediaKind};
pub use user::User;

/// An entity addressable by a path identifier.
///
/// The request-context middleware parses the raw path segment into `Id` and
/// loads the matching entity before the handler runs.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: FromStr + Clone + fmt::Display + Send + Sync + 'static;

    /// Human-readable name used in error messages ("user", "media").
    const NAME: &'static str;
}

impl Entity for User {
    type Id = user::UserId;
    const NAME: &'static str = "user";
}

impl Entity for Media {
    type Id = uuid::Uuid;
    const NAME: &'static str = "media";
}
