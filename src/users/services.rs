use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use super::error::{StoreError, UniqueField, UserError};
use super::password::PasswordDigester;
use super::repo::UserStore;
use super::repo_types::{
    NewUserRecord, User, UserChanges, UserFilter, UserId, UserOrder, UserRecord, UserStatus,
};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Fields to change on [`UserService::update`]. `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub status: Option<UserStatus>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            search: None,
            status: None,
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    digester: PasswordDigester,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, digester: PasswordDigester) -> Self {
        Self { store, digester }
    }

    #[instrument(
        name = "userdesk.service.create_user",
        skip(self, new_user),
        fields(username = %new_user.username, email = %new_user.email)
    )]
    pub async fn create(&self, new_user: NewUser) -> Result<User, UserError> {
        let NewUser {
            username,
            email,
            password,
        } = new_user;

        if self.store.count(&UserFilter::by_username(&username)).await? > 0 {
            warn!("username already taken");
            return Err(UserError::DuplicateUsername(username));
        }
        if self.store.count(&UserFilter::by_email(&email)).await? > 0 {
            warn!("email already taken");
            return Err(UserError::DuplicateEmail(email));
        }

        let password_digest = self.digester.digest(&password)?;
        let now = now_utc();
        let record = NewUserRecord {
            username: username.clone(),
            email: email.clone(),
            password_digest,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };

        // The unique constraints decide races the pre-checks above cannot see.
        let id = self
            .store
            .insert(record.clone())
            .await
            .map_err(|e| duplicate_or_store(e, &username, &email))?;

        info!(user_id = id, "user created");
        Ok(User::from(UserRecord {
            id,
            username: record.username,
            email: record.email,
            password_digest: record.password_digest,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }))
    }

    #[instrument(name = "userdesk.service.get_user", skip(self), fields(user_id = id))]
    pub async fn get_by_id(&self, id: UserId) -> Result<User, UserError> {
        self.find(id).await.map(User::from)
    }

    /// Returns one page of matching users plus the total number of matches.
    #[instrument(
        name = "userdesk.service.list_users",
        skip(self, query),
        fields(page = query.page, size = query.page_size)
    )]
    pub async fn get_list(&self, query: ListQuery) -> Result<(Vec<User>, u64), UserError> {
        let filter = UserFilter {
            search: query.search.filter(|s| !s.is_empty()),
            status: query.status,
            ..UserFilter::default()
        };

        let total = self.store.count(&filter).await?;
        let rows = self
            .store
            .scan(&filter, query.page, query.page_size, UserOrder::CreatedAtDesc)
            .await?;

        debug!(total, returned = rows.len(), "users listed");
        Ok((rows.into_iter().map(User::from).collect(), total))
    }

    #[instrument(
        name = "userdesk.service.update_user",
        skip(self, patch),
        fields(user_id = id)
    )]
    pub async fn update(&self, id: UserId, patch: UserPatch) -> Result<User, UserError> {
        let current = self.find(id).await?;
        let mut changes = UserChanges::touch(next_update_time(current.updated_at));

        if let Some(username) = patch.username.filter(|u| *u != current.username) {
            let taken = UserFilter::by_username(&username).excluding(id);
            if self.store.count(&taken).await? > 0 {
                warn!(%username, "username already taken");
                return Err(UserError::DuplicateUsername(username));
            }
            changes.username = Some(username);
        }

        if let Some(email) = patch.email.filter(|e| *e != current.email) {
            let taken = UserFilter::by_email(&email).excluding(id);
            if self.store.count(&taken).await? > 0 {
                warn!(%email, "email already taken");
                return Err(UserError::DuplicateEmail(email));
            }
            changes.email = Some(email);
        }

        changes.status = patch.status;

        let username = changes.username.clone().unwrap_or(current.username);
        let email = changes.email.clone().unwrap_or(current.email);
        let touched = self
            .store
            .update(id, changes)
            .await
            .map_err(|e| duplicate_or_store(e, &username, &email))?;
        if touched == 0 {
            return Err(UserError::NotFound(id));
        }

        info!("user updated");
        self.get_by_id(id).await
    }

    /// Deletes an existing user. Deleting an unknown id is `NotFound`; a row
    /// removed concurrently between the check and the delete is not an error.
    #[instrument(name = "userdesk.service.delete_user", skip(self), fields(user_id = id))]
    pub async fn delete(&self, id: UserId) -> Result<(), UserError> {
        self.find(id).await?;
        let removed = self.store.delete(id).await?;
        if removed == 0 {
            debug!("user already removed by a concurrent request");
        }
        info!("user deleted");
        Ok(())
    }

    async fn find(&self, id: UserId) -> Result<UserRecord, UserError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }
}

fn duplicate_or_store(e: StoreError, username: &str, email: &str) -> UserError {
    match e {
        StoreError::UniqueViolation(UniqueField::Username) => {
            UserError::DuplicateUsername(username.to_string())
        }
        StoreError::UniqueViolation(UniqueField::Email) => {
            UserError::DuplicateEmail(email.to_string())
        }
        other => UserError::Store(other),
    }
}

/// Current time at the precision PostgreSQL stores (microseconds).
fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

/// Timestamp for a mutation, always strictly after `previous`.
fn next_update_time(previous: OffsetDateTime) -> OffsetDateTime {
    now_utc().max(previous + Duration::microseconds(1))
}
