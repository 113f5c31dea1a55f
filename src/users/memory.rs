//! In-process `UserStore` used by the service and router tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;

use super::error::{StoreError, UniqueField};
use super::repo::UserStore;
use super::repo_types::{NewUserRecord, UserChanges, UserFilter, UserId, UserOrder, UserRecord};

#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
    fail: AtomicBool,
}

#[derive(Default)]
struct Inner {
    rows: Vec<UserRecord>,
    last_id: UserId,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the database were unreachable.
    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Inserts a record without going through the service's uniqueness checks.
    pub fn seed(&self, record: NewUserRecord) -> UserId {
        let mut inner = self.inner.lock().unwrap();
        inner.last_id += 1;
        let id = inner.last_id;
        inner.rows.push(UserRecord {
            id,
            username: record.username,
            email: record.email,
            password_digest: record.password_digest,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        });
        id
    }

    pub fn raw(&self, id: UserId) -> Option<UserRecord> {
        let inner = self.inner.lock().unwrap();
        inner.rows.iter().find(|r| r.id == id).cloned()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

fn check_unique(
    rows: &[UserRecord],
    skip: Option<UserId>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<(), StoreError> {
    for r in rows.iter().filter(|r| Some(r.id) != skip) {
        if username == Some(r.username.as_str()) {
            return Err(StoreError::UniqueViolation(UniqueField::Username));
        }
        if email == Some(r.email.as_str()) {
            return Err(StoreError::UniqueViolation(UniqueField::Email));
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn count(&self, filter: &UserFilter) -> Result<u64, StoreError> {
        self.check()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.rows.iter().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn scan(
        &self,
        filter: &UserFilter,
        page: u32,
        page_size: u32,
        order: UserOrder,
    ) -> Result<Vec<UserRecord>, StoreError> {
        self.check()?;
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<UserRecord> = inner
            .rows
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        match order {
            UserOrder::CreatedAtDesc => {
                rows.sort_by_key(|r| std::cmp::Reverse((r.created_at, r.id)))
            }
        }
        let offset = page.saturating_sub(1) as usize * page_size as usize;
        Ok(rows.into_iter().skip(offset).take(page_size as usize).collect())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.check()?;
        Ok(self.raw(id))
    }

    async fn insert(&self, record: NewUserRecord) -> Result<UserId, StoreError> {
        self.check()?;
        {
            let inner = self.inner.lock().unwrap();
            check_unique(
                &inner.rows,
                None,
                Some(&record.username),
                Some(&record.email),
            )?;
        }
        Ok(self.seed(record))
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> Result<u64, StoreError> {
        self.check()?;
        let mut inner = self.inner.lock().unwrap();
        check_unique(
            &inner.rows,
            Some(id),
            changes.username.as_deref(),
            changes.email.as_deref(),
        )?;
        let Some(row) = inner.rows.iter_mut().find(|r| r.id == id) else {
            return Ok(0);
        };
        if let Some(username) = changes.username {
            row.username = username;
        }
        if let Some(email) = changes.email {
            row.email = email;
        }
        if let Some(status) = changes.status {
            row.status = status;
        }
        row.updated_at = changes.updated_at;
        Ok(1)
    }

    async fn delete(&self, id: UserId) -> Result<u64, StoreError> {
        self.check()?;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.rows.len();
        inner.rows.retain(|r| r.id != id);
        Ok((before - inner.rows.len()) as u64)
    }
}
