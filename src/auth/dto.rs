use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::auth::repo::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    pub gender: String,
    pub birth_date: Date,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Public part of the user returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub gender: String,
    pub birth_date: Date,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            gender: u.gender,
            birth_date: u.birth_date,
            is_admin: u.is_admin,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn public_user_never_carries_the_password_hash() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: Some("alice@example.com".into()),
            password_hash: "secret-hash".into(),
            gender: "F".into(),
            birth_date: date!(1990 - 01 - 01),
            is_admin: false,
            created_at: datetime!(2024-01-01 00:00 UTC),
            modified_at: datetime!(2024-01-01 00:00 UTC),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("alice"));
        assert!(json.contains("\"birthDate\":\"1990-01-01\""));
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn register_request_accepts_missing_email() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"bob","password":"pw123456","gender":"M","birthDate":"1985-06-15"}"#,
        )
        .unwrap();
        assert_eq!(req.username, "bob");
        assert!(req.email.is_none());
        assert_eq!(req.birth_date, date!(1985 - 06 - 15));
    }
}
