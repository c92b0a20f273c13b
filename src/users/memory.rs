use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use crate::error::{UserError, UserKey, UserResult};
use crate::users::repo::{page_offset, UserRepository};
use crate::users::repo_types::{NewUser, User};

/// In-memory implementation of [`UserRepository`] for development and tests.
///
/// Mirrors the table's guarantees: ids only grow and emails are unique.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    inner: Arc<RwLock<Table>>,
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, User>,
    last_id: i64,
}

impl Table {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> UserResult<User> {
        let mut table = self.inner.write().await;
        if table.email_taken(&user.email, None) {
            return Err(UserError::DuplicateEmail(user.email));
        }

        table.last_id += 1;
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: table.last_id,
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let table = self.inner.read().await;
        Ok(table.rows.values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, user: &User) -> UserResult<User> {
        let mut table = self.inner.write().await;
        if !table.rows.contains_key(&user.id) {
            return Err(UserError::NotFound(UserKey::Id(user.id)));
        }
        if table.email_taken(&user.email, Some(user.id)) {
            return Err(UserError::DuplicateEmail(user.email.clone()));
        }

        let row = table
            .rows
            .get_mut(&user.id)
            .ok_or(UserError::NotFound(UserKey::Id(user.id)))?;
        row.email = user.email.clone();
        row.password_hash = user.password_hash.clone();
        row.name = user.name.clone();
        row.updated_at =
            OffsetDateTime::now_utc().max(row.updated_at + Duration::microseconds(1));
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> UserResult<()> {
        let mut table = self.inner.write().await;
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(UserError::NotFound(UserKey::Id(id)))
    }

    async fn list(&self, page: i64, limit: i64) -> UserResult<Vec<User>> {
        let table = self.inner.read().await;
        let offset = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(table.rows.values().skip(offset).take(limit).cloned().collect())
    }
}
