//! # Database Module
//!
//! User account storage behind the [`UserStore`] capability, with an
//! in-memory backend for local development and a PostgreSQL backend
//! (tokio-postgres + deadpool) for deployments.

pub mod connection;
pub mod memory;
pub mod migrations;
pub mod models;

use async_trait::async_trait;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use memory::MemoryUserStore;
pub use models::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user with this email already exists")]
    DuplicateEmail,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Account persistence used by the signup and login handlers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Persist a new account, assigning its id and timestamps.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Cheap liveness check of the backend.
    async fn ping(&self) -> Result<(), StoreError>;
}
