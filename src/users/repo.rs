use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::error::{StoreError, UniqueField};
use super::repo_types::{
    NewUserRecord, UserChanges, UserFilter, UserId, UserOrder, UserRecord, UserRow,
};

const USER_COLUMNS: &str =
    "id, username, email, password_digest, status, created_at, updated_at";

/// Persistence port for the `users` table.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn count(&self, filter: &UserFilter) -> Result<u64, StoreError>;

    /// One page (1-indexed) of matching records. Pages past the end are empty.
    async fn scan(
        &self,
        filter: &UserFilter,
        page: u32,
        page_size: u32,
        order: UserOrder,
    ) -> Result<Vec<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    async fn insert(&self, record: NewUserRecord) -> Result<UserId, StoreError>;

    async fn update(&self, id: UserId, changes: UserChanges) -> Result<u64, StoreError>;

    /// Returns 0 when the row was already gone.
    async fn delete(&self, id: UserId) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn count(&self, filter: &UserFilter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filter(&mut qb, filter);
        let total: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx_error)?;
        Ok(total.max(0) as u64)
    }

    async fn scan(
        &self,
        filter: &UserFilter,
        page: u32,
        page_size: u32,
        order: UserOrder,
    ) -> Result<Vec<UserRecord>, StoreError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filter(&mut qb, filter);
        qb.push(match order {
            UserOrder::CreatedAtDesc => " ORDER BY created_at DESC, id DESC",
        });
        qb.push(" LIMIT ")
            .push_bind(i64::from(page_size))
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<UserRow> = qb
            .build_query_as()
            .fetch_all(&self.db)
            .await
            .map_err(map_sqlx_error)?;
        debug!(rows = rows.len(), page, page_size, "users scanned");
        rows.into_iter().map(UserRecord::try_from).collect()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx_error)?;
        row.map(UserRecord::try_from).transpose()
    }

    async fn insert(&self, record: NewUserRecord) -> Result<UserId, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (username, email, password_digest, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(record.username)
        .bind(record.email)
        .bind(record.password_digest)
        .bind(record.status.as_i16())
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_error)?;
        Ok(id)
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = ");
        qb.push_bind(changes.updated_at);
        if let Some(username) = changes.username {
            qb.push(", username = ").push_bind(username);
        }
        if let Some(email) = changes.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(status) = changes.status {
            qb.push(", status = ").push_bind(status.as_i16());
        }
        qb.push(" WHERE id = ").push_bind(id);

        let res = qb
            .build()
            .execute(&self.db)
            .await
            .map_err(map_sqlx_error)?;
        Ok(res.rows_affected())
    }

    async fn delete(&self, id: UserId) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_error)?;
        Ok(res.rows_affected())
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    let mut first = true;

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        and_where(qb, &mut first);
        qb.push("(username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = filter.status {
        and_where(qb, &mut first);
        qb.push("status = ").push_bind(status.as_i16());
    }
    if let Some(username) = &filter.username {
        and_where(qb, &mut first);
        qb.push("username = ").push_bind(username.clone());
    }
    if let Some(email) = &filter.email {
        and_where(qb, &mut first);
        qb.push("email = ").push_bind(email.clone());
    }
    if let Some(id) = filter.exclude_id {
        and_where(qb, &mut first);
        qb.push("id <> ").push_bind(id);
    }
}

fn and_where(qb: &mut QueryBuilder<'_, Postgres>, first: &mut bool) {
    qb.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

/// Escapes LIKE metacharacters so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            match db.constraint() {
                Some(c) if c.contains("username") => {
                    return StoreError::UniqueViolation(UniqueField::Username)
                }
                Some(c) if c.contains("email") => {
                    return StoreError::UniqueViolation(UniqueField::Email)
                }
                _ => {}
            }
        }
    }
    StoreError::Database(e)
}
