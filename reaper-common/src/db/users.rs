//! User account queries

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::auth::{generate_salt, hash_password, verify_password};
use crate::db::models::{User, UserCredentials};
use crate::{Error, Result};

/// Canonical form used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a user with a salted password hash
///
/// Returns `Error::Conflict` if the email is already registered.
pub async fn create_user(pool: &SqlitePool, email: &str, password: &str, name: &str) -> Result<User> {
    let id = Uuid::new_v4().to_string();
    let email = normalize_email(email);
    let salt = generate_salt();
    let password_hash = hash_password(password, &salt);

    let result = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, name, password_hash, password_salt, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, email, name, created_at
        "#,
    )
    .bind(&id)
    .bind(&email)
    .bind(name.trim())
    .bind(&password_hash)
    .bind(&salt)
    .bind(Utc::now())
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(e) if Error::is_unique_violation(&e) => {
            Err(Error::Conflict(format!("Email already registered: {}", email)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Check credentials; `Ok(None)` for an unknown email or a wrong password
pub async fn verify_user(pool: &SqlitePool, email: &str, password: &str) -> Result<Option<User>> {
    let credentials = sqlx::query_as::<_, UserCredentials>(
        r#"
        SELECT id, email, name, created_at, password_hash, password_salt
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await?;

    Ok(credentials
        .filter(|c| verify_password(password, &c.password_salt, &c.password_hash))
        .map(User::from))
}

pub async fn get_user_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT id, email, name, created_at FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}
