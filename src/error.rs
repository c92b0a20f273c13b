use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::users::password::PasswordPolicyError;

/// Storage operation a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Create,
    Get,
    GetByEmail,
    Update,
    Delete,
    List,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            StorageOp::Create => "create",
            StorageOp::Get => "get",
            StorageOp::GetByEmail => "get by email",
            StorageOp::Update => "update",
            StorageOp::Delete => "delete",
            StorageOp::List => "list",
        };
        f.write_str(op)
    }
}

/// How a missing user was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Id(i64),
    Email(String),
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::Id(id) => write!(f, "ID {id}"),
            UserKey::Email(email) => write!(f, "email {email}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(#[from] PasswordPolicyError),

    #[error("Email {0} is already registered")]
    DuplicateEmail(String),

    #[error("User with {0} not found")]
    NotFound(UserKey),

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Database {op} error")]
    Storage {
        op: StorageOp,
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

pub type UserResult<T> = Result<T, UserError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl UserError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        UserError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn storage(op: StorageOp, source: impl Into<anyhow::Error>) -> Self {
        UserError::Storage {
            op,
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UserError::InvalidInput { .. }
            | UserError::InvalidEmail(_)
            | UserError::InvalidPassword(_) => StatusCode::BAD_REQUEST,
            UserError::DuplicateEmail(_) => StatusCode::CONFLICT,
            UserError::NotFound(_) => StatusCode::NOT_FOUND,
            UserError::Unauthorized => StatusCode::UNAUTHORIZED,
            UserError::Storage { .. } | UserError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            // the cause stays in the logs
            error!(error = ?self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
