// Database Models
//
// Account records as stored by either backend.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

use crate::auth::models::{IdentityClaims, PublicUser, Role};

/// Stored user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account data before the store assigns an id
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

impl User {
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }

    /// Claims minted into tokens at login/signup time.
    pub fn identity_claims(&self) -> IdentityClaims {
        IdentityClaims {
            user_id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Trait for converting from tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self>
    where
        Self: Sized;
}

impl FromRow for User {
    fn from_row(row: &Row) -> Result<Self> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            password_hash: row.try_get("password_hash")?,
            role: role.parse::<Role>().context("Invalid role stored for user")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
