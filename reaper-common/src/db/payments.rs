//! Unlock payment records

use chrono::Utc;
use sqlx::SqlitePool;

use crate::api::types::PaymentStatus;
use crate::db::models::UserPayment;
use crate::db::subscriptions::count_subscriptions;
use crate::Result;

pub async fn has_paid(pool: &SqlitePool, user_id: &str) -> Result<bool> {
    let paid: Option<bool> =
        sqlx::query_scalar("SELECT has_paid FROM user_payments WHERE user_id = ? LIMIT 1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(paid.unwrap_or(false))
}

/// Paid flag and subscription count for the free-tier check
pub async fn payment_status(pool: &SqlitePool, user_id: &str) -> Result<PaymentStatus> {
    let (has_paid, subscription_count) =
        tokio::try_join!(has_paid(pool, user_id), count_subscriptions(pool, user_id))?;
    Ok(PaymentStatus {
        has_paid,
        subscription_count,
    })
}

/// Mark a user as paid; repeated calls overwrite the intent id and paid_at
pub async fn record_payment(pool: &SqlitePool, user_id: &str, payment_intent_id: &str) -> Result<()> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO user_payments (user_id, has_paid, stripe_payment_intent_id, paid_at, created_at)
        VALUES (?, 1, ?, ?, ?)
        ON CONFLICT (user_id)
        DO UPDATE SET
            has_paid = 1,
            stripe_payment_intent_id = excluded.stripe_payment_intent_id,
            paid_at = excluded.paid_at
        "#,
    )
    .bind(user_id)
    .bind(payment_intent_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_payment(pool: &SqlitePool, user_id: &str) -> Result<Option<UserPayment>> {
    let payment = sqlx::query_as::<_, UserPayment>("SELECT * FROM user_payments WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::users::create_user;

    #[tokio::test]
    async fn test_unpaid_by_default() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "p@example.com", "pw", "P").await.unwrap();

        let status = payment_status(&pool, &user.id).await.unwrap();
        assert!(!status.has_paid);
        assert_eq!(status.subscription_count, 0);
        assert!(get_payment(&pool, &user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_payment_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "p@example.com", "pw", "P").await.unwrap();

        record_payment(&pool, &user.id, "pi_first").await.unwrap();
        record_payment(&pool, &user.id, "pi_second").await.unwrap();

        assert!(has_paid(&pool, &user.id).await.unwrap());
        let payment = get_payment(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(payment.stripe_payment_intent_id.as_deref(), Some("pi_second"));
        assert!(payment.paid_at.is_some());

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_payments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }
}
