//! In-memory user store for local development and tests.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::models::{NewUser, User};
use super::{StoreError, UserStore};

#[derive(Debug)]
struct Inner {
    users: Vec<User>,
    next_id: i64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            next_id: 1,
        }
    }
}

/// Process-local account table; ids start at 1.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every account and restart ids at 1.
    pub fn clear(&self) {
        *self.inner.write() = Inner::default();
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .inner
            .read()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write();
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let created = User {
            id: inner.next_id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        inner.next_id += 1;
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.inner.read().users.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
