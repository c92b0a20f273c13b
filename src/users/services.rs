use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::error::{UserError, UserKey, UserResult};
use crate::users::{
    dto::{CreateUserRequest, UpdateUserRequest},
    password::{hash_password_blocking, validate_password_strength, verify_password_blocking},
    repo::UserRepository,
    repo_types::{NewUser, User},
};

const MAX_EMAIL_LEN: usize = 254;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$"
        )
        .unwrap();
    }
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

/// Surrounding whitespace is dropped; case is kept as given.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_string()
}

fn validate_email(email: &str) -> UserResult<()> {
    if !is_valid_email(email) {
        warn!(email = %email, "invalid email");
        return Err(UserError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

fn validate_name(name: &str) -> UserResult<String> {
    let name = name.trim();
    if name.is_empty() {
        warn!("empty name");
        return Err(UserError::invalid_input("name", "cannot be empty"));
    }
    Ok(name.to_string())
}

fn validate_password(password: &str) -> UserResult<()> {
    validate_password_strength(password).map_err(|e| {
        warn!(rule = %e, "weak password");
        UserError::InvalidPassword(e)
    })
}

/// User business rules. Handlers talk to this trait only.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn create_user(&self, input: CreateUserRequest) -> UserResult<User>;
    async fn get_user(&self, id: i64) -> UserResult<User>;
    /// Applies the provided fields; omitted ones and an empty password keep their stored value.
    async fn update_user(&self, id: i64, input: UpdateUserRequest) -> UserResult<User>;
    async fn delete_user(&self, id: i64) -> UserResult<()>;
    async fn list_users(&self, page: i64, limit: i64) -> UserResult<Vec<User>>;
    /// Returns the user whose stored hash matches `password`.
    async fn verify_password(&self, email: &str, password: &str) -> UserResult<User>;
}

#[derive(Clone)]
pub struct DefaultUserService<R: UserRepository> {
    repo: Arc<R>,
    max_page_size: i64,
}

impl<R: UserRepository> DefaultUserService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo: Arc::new(repo),
            max_page_size: ApiConfig::default().max_page_size,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: i64) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<i64>) -> UserResult<()> {
        match self.repo.get_by_email(email).await? {
            Some(other) if Some(other.id) != owner => {
                warn!(email = %email, "email already registered");
                Err(UserError::DuplicateEmail(email.to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<R: UserRepository + 'static> UserService for DefaultUserService<R> {
    async fn create_user(&self, input: CreateUserRequest) -> UserResult<User> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;
        let name = validate_name(&input.name)?;
        validate_password(&input.password)?;
        self.ensure_email_free(&email, None).await?;

        let password_hash = hash_password_blocking(input.password).await?;
        let user = self
            .repo
            .create(NewUser {
                email,
                password_hash,
                name,
            })
            .await?;

        info!(user_id = user.id, email = %user.email, "user created");
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> UserResult<User> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(UserKey::Id(id)))
    }

    async fn update_user(&self, id: i64, input: UpdateUserRequest) -> UserResult<User> {
        let mut user = self.get_user(id).await?;

        if let Some(email) = input.email.as_deref().map(normalize_email) {
            if email != user.email {
                validate_email(&email)?;
                self.ensure_email_free(&email, Some(id)).await?;
                user.email = email;
            }
        }

        let new_password = input.password.filter(|p| !p.is_empty());
        if let Some(password) = &new_password {
            validate_password(password)?;
        }

        if let Some(name) = &input.name {
            user.name = name.clone();
        }
        user.name = validate_name(&user.name)?;

        if let Some(password) = new_password {
            user.password_hash = hash_password_blocking(password).await?;
        }

        let user = self.repo.update(&user).await?;
        info!(user_id = user.id, "user updated");
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> UserResult<()> {
        self.get_user(id).await?;
        self.repo.delete(id).await?;
        info!(user_id = id, "user deleted");
        Ok(())
    }

    async fn list_users(&self, page: i64, limit: i64) -> UserResult<Vec<User>> {
        if page < 1 {
            return Err(UserError::invalid_input("page", "must be at least 1"));
        }
        if limit < 1 {
            return Err(UserError::invalid_input("limit", "must be at least 1"));
        }
        if limit > self.max_page_size {
            return Err(UserError::invalid_input(
                "limit",
                format!("must not exceed {}", self.max_page_size),
            ));
        }
        self.repo.list(page, limit).await
    }

    async fn verify_password(&self, email: &str, password: &str) -> UserResult<User> {
        let email = normalize_email(email);
        let user = self
            .repo
            .get_by_email(&email)
            .await?
            .ok_or_else(|| UserError::NotFound(UserKey::Email(email.clone())))?;

        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
            warn!(user_id = user.id, "password mismatch");
            return Err(UserError::Unauthorized);
        }
        Ok(user)
    }
}
