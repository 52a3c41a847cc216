//! Storage capabilities.
//!
//! Services never see a concrete database. They get the narrow trait they need
//! (save a user, look one up, save an item, list items) behind an `Arc<dyn _>`.
//! Postgres implements all of them in `crate::db`; `MemoryStore` implements them
//! for tests and for running the API without a database.

pub mod memory;

use crate::models::{item::Item, user::User};
use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("user already exists")]
    UserExists,

    #[error("user not found")]
    UserNotFound,

    #[error("{op}: {source}")]
    Database {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StorageError {
    /// Wraps a raw sqlx error with the name of the operation that produced it.
    pub fn database(op: &'static str, source: sqlx::Error) -> Self {
        Self::Database { op, source }
    }
}

#[async_trait]
pub trait UserSaver: Send + Sync {
    /// Persists a new user and returns its generated id.
    /// Fails with `UserExists` when the email is already taken.
    async fn save_user(&self, email: &str, password_hash: &str) -> Result<i64, StorageError>;
}

#[async_trait]
pub trait UserProvider: Send + Sync {
    /// Looks a user up by email. Fails with `UserNotFound` when there is none.
    async fn user(&self, email: &str) -> Result<User, StorageError>;
}

#[async_trait]
pub trait ItemSaver: Send + Sync {
    async fn save_item(
        &self,
        owner_id: i64,
        title: &str,
        description: &str,
    ) -> Result<i64, StorageError>;
}

#[async_trait]
pub trait ItemProvider: Send + Sync {
    /// All items owned by `owner_id`, in insertion order. Empty is not an error.
    async fn items(&self, owner_id: i64) -> Result<Vec<Item>, StorageError>;
}

#[async_trait]
pub trait StorageHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Convenience bound for a backend that can do everything.
pub trait Store: UserSaver + UserProvider + ItemSaver + ItemProvider + StorageHealth {}

impl<T> Store for T where T: UserSaver + UserProvider + ItemSaver + ItemProvider + StorageHealth {}
