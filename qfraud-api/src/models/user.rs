//! Credential records

use serde::Serialize;

/// Row of the `users` table, including the password hash
///
/// Never serialized; handlers return `UserProfile` instead.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    #[sqlx(rename = "username")]
    pub name: String,
    pub email: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    #[sqlx(rename = "username")]
    pub name: String,
    pub email: String,
    pub created_at: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: None,
        }
    }
}
