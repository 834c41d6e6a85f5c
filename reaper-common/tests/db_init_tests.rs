//! Database initialization tests
//!
//! - Automatic database creation with the full schema on first run
//! - Reopening an existing database
//! - Idempotent initialization (safe to run at every startup)
//! - Foreign keys enforced on pooled connections

use reaper_common::db::init::init_database;
use tempfile::TempDir;

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("reaper.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_schema_tables_created() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("reaper.db")).await.unwrap();

    let tables = table_names(&pool).await;
    for expected in [
        "saas_products",
        "schema_version",
        "sessions",
        "subscriptions",
        "user_payments",
        "users",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[tokio::test]
async fn test_idempotent_initialization() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("reaper.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, password_salt) VALUES ('u1', 'a@b.c', 'A', 'h', 's')",
    )
    .execute(&pool1)
    .await
    .unwrap();
    pool1.close().await;

    // Reopen: schema untouched, data preserved, version recorded once per migration
    let pool2 = init_database(&db_path).await.unwrap();
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(users, 1);

    let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(versions, 1);
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("reaper.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, name, renewal_date, seats, cost_per_seat) VALUES ('ghost', 'X', '2026-01-01', 1, 1.0)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Insert for a missing user should violate the foreign key");
}
