use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;

use super::error::StoreError;

pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum UserStatus {
    Inactive,
    Active,
}

impl UserStatus {
    pub fn as_i16(self) -> i16 {
        match self {
            UserStatus::Inactive => 0,
            UserStatus::Active => 1,
        }
    }
}

impl From<UserStatus> for i16 {
    fn from(s: UserStatus) -> Self {
        s.as_i16()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid user status {0}")]
pub struct InvalidStatus(pub i16);

impl TryFrom<i16> for UserStatus {
    type Error = InvalidStatus;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(UserStatus::Inactive),
            1 => Ok(UserStatus::Active),
            other => Err(InvalidStatus(other)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_digest: String,
    pub status: i16,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Persisted user, including the password digest. Never leaves the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_digest: String,
    pub status: UserStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StoreError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let status = UserStatus::try_from(r.status)
            .map_err(|e| StoreError::InvalidRow(format!("user {}: {}", r.id, e)))?;
        Ok(Self {
            id: r.id,
            username: r.username,
            email: r.email,
            password_digest: r.password_digest,
            status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Public view of a user returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        Self {
            id: r.id,
            username: r.username,
            email: r.email,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub email: String,
    pub password_digest: String,
    pub status: UserStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Sparse change set; `None` fields are left untouched.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub status: Option<UserStatus>,
    pub updated_at: OffsetDateTime,
}

impl UserChanges {
    pub fn touch(updated_at: OffsetDateTime) -> Self {
        Self {
            username: None,
            email: None,
            status: None,
            updated_at,
        }
    }
}

/// Predicate over the `users` table. Every present clause must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Case-insensitive substring of username OR email.
    pub search: Option<String>,
    pub status: Option<UserStatus>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub exclude_id: Option<UserId>,
}

impl UserFilter {
    pub fn by_username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn excluding(mut self, id: UserId) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn matches(&self, r: &UserRecord) -> bool {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !r.username.to_lowercase().contains(&needle)
                && !r.email.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != r.status) {
            return false;
        }
        if self.username.as_deref().is_some_and(|u| u != r.username) {
            return false;
        }
        if self.email.as_deref().is_some_and(|e| e != r.email) {
            return false;
        }
        if self.exclude_id == Some(r.id) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserOrder {
    #[default]
    CreatedAtDesc,
}
