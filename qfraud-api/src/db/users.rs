//! Credential table operations

use qfraud_common::Result;
use sqlx::SqlitePool;

use crate::models::{User, UserProfile};

/// Outcome of inserting a new user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUser {
    Created(i64),
    DuplicateEmail,
}

/// Insert a user; the email column is unique
pub async fn create_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<CreateUser> {
    let result = sqlx::query("INSERT INTO users (username, email, password) VALUES (?, ?, ?)")
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(CreateUser::Created(done.last_insert_rowid())),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Ok(CreateUser::DuplicateEmail)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Replace the stored password hash; returns the number of rows changed
pub async fn update_password(pool: &SqlitePool, email: &str, password_hash: &str) -> Result<u64> {
    let result = sqlx::query("UPDATE users SET password = ? WHERE email = ?")
        .bind(password_hash)
        .bind(email)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// All users, without password hashes
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<UserProfile>> {
    let users = sqlx::query_as::<_, UserProfile>(
        "SELECT id, username, email, CAST(created_at AS TEXT) AS created_at FROM users ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}
