//! User store port.

use async_trait::async_trait;

use crate::user::{NewUser, User, UserId};

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Errors raised by a user store.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("SQL request failed: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("email {0} is already used")]
    EmailTaken(String),
}

/// Read and create users.
///
/// Implementations must be safe to call from any number of requests at once;
/// callers never retry.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user using its `id`.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Find a user using its email, compared case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new user and return it with its assigned `id`.
    async fn insert(&self, user: NewUser) -> Result<User>;
}
