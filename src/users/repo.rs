use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

use crate::error::{StorageOp, UserError, UserKey, UserResult};
use crate::users::repo_types::{NewUser, User};

/// Persistence contract for users.
///
/// Lookups report absence as `Ok(None)`; `update` and `delete` report it as
/// [`UserError::NotFound`]. A unique-email violation surfaces as
/// [`UserError::DuplicateEmail`], everything else as [`UserError::Storage`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> UserResult<User>;
    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>>;
    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;
    /// Replaces email, password hash and name of the row with `user.id`.
    async fn update(&self, user: &User) -> UserResult<User>;
    async fn delete(&self, id: i64) -> UserResult<()>;
    /// Rows ordered by id; `page` and `limit` must both be at least 1.
    async fn list(&self, page: i64, limit: i64) -> UserResult<Vec<User>>;
}

pub fn page_offset(page: i64, limit: i64) -> i64 {
    (page - 1).saturating_mul(limit)
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn storage_error(op: StorageOp) -> impl FnOnce(sqlx::Error) -> UserError {
    move |e| {
        error!(error = %e, op = %op, "user storage failure");
        UserError::storage(op, e)
    }
}

fn write_error(op: StorageOp, email: &str) -> impl FnOnce(sqlx::Error) -> UserError + '_ {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            UserError::DuplicateEmail(email.to_string())
        }
        _ => storage_error(op)(e),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> UserResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, name, created_at, updated_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .fetch_one(&self.db)
        .await
        .map_err(write_error(StorageOp::Create, &user.email))
    }

    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(storage_error(StorageOp::Get))
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(storage_error(StorageOp::GetByEmail))
    }

    async fn update(&self, user: &User) -> UserResult<User> {
        // updated_at must move forward even when two updates share a clock tick
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET email = $2,
                   password_hash = $3,
                   name = $4,
                   updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')
             WHERE id = $1
            RETURNING id, email, password_hash, name, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .fetch_optional(&self.db)
        .await
        .map_err(write_error(StorageOp::Update, &user.email))?
        .ok_or(UserError::NotFound(UserKey::Id(user.id)))
    }

    async fn delete(&self, id: i64) -> UserResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(storage_error(StorageOp::Delete))?;
        if result.rows_affected() == 0 {
            return Err(UserError::NotFound(UserKey::Id(id)));
        }
        Ok(())
    }

    async fn list(&self, page: i64, limit: i64) -> UserResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, created_at, updated_at
            FROM users
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(page_offset(page, limit))
        .fetch_all(&self.db)
        .await
        .map_err(storage_error(StorageOp::List))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(2, 10), 10);
        assert_eq!(page_offset(3, 25), 50);
    }

    #[test]
    fn offset_saturates_instead_of_overflowing() {
        assert_eq!(page_offset(i64::MAX, 100), i64::MAX);
    }
}
