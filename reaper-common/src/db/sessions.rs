//! Server-side session storage
//!
//! The cookie carries only the random token; the user id never leaves the server.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::api::auth::{generate_session_token, SESSION_MAX_AGE_SECS};
use crate::db::models::User;
use crate::Result;

#[derive(sqlx::FromRow)]
struct SessionUserRow {
    id: String,
    email: String,
    name: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Start a session for a user and return its token
pub async fn create_session(pool: &SqlitePool, user_id: &str) -> Result<String> {
    let token = generate_session_token();
    let now = Utc::now();
    let expires_at = now + Duration::seconds(SESSION_MAX_AGE_SECS);

    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolve a session token to its user
///
/// Unknown tokens yield `None`; expired ones are deleted and yield `None`.
pub async fn get_session_user(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    get_session_user_at(pool, token, Utc::now()).await
}

pub async fn get_session_user_at(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, SessionUserRow>(
        r#"
        SELECT u.id, u.email, u.name, u.created_at, s.expires_at
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    if row.expires_at <= now {
        debug!(user_id = %row.id, "Session expired");
        delete_session(pool, token).await?;
        return Ok(None);
    }

    Ok(Some(User {
        id: row.id,
        email: row.email,
        name: row.name,
        created_at: row.created_at,
    }))
}

/// Delete a session; deleting an unknown token is not an error
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove every expired session, returning how many were deleted
pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::users::create_user;

    #[tokio::test]
    async fn test_session_round_trip() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "s@example.com", "pw", "S").await.unwrap();

        let token = create_session(&pool, &user.id).await.unwrap();
        let resolved = get_session_user(&pool, &token).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        delete_session(&pool, &token).await.unwrap();
        assert!(get_session_user(&pool, &token).await.unwrap().is_none());

        // Idempotent
        delete_session(&pool, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let pool = init_memory_database().await.unwrap();
        assert!(get_session_user(&pool, "deadbeef").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "e@example.com", "pw", "E").await.unwrap();
        let token = create_session(&pool, &user.id).await.unwrap();

        let after_expiry = Utc::now() + Duration::seconds(SESSION_MAX_AGE_SECS + 60);
        assert!(get_session_user_at(&pool, &token, after_expiry).await.unwrap().is_none());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
