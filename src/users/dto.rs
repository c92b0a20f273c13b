use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::repo_types::User;

/// Request body for user creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request body for user updates. Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Request body for credential verification.
#[derive(Debug, Deserialize)]
pub struct VerifyPasswordRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn public_user_never_serializes_the_hash() {
        let user = User {
            id: 1,
            email: "test@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            name: "Test".into(),
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-02 0:00 UTC),
        };

        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn update_request_fields_are_optional() {
        let req: UpdateUserRequest = serde_json::from_str(r#"{"name":"B"}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("B"));
        assert!(req.email.is_none());
        assert!(req.password.is_none());
    }
}
