//! Subscription queries
//!
//! Every query is scoped by `user_id`; a user can never see or modify another
//! user's rows.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{NewSubscription, Subscription, SubscriptionPatch};
use crate::plan::FREE_SUBSCRIPTION_LIMIT;
use crate::Result;

/// All subscriptions for a user, soonest renewal first
pub async fn list_subscriptions(pool: &SqlitePool, user_id: &str) -> Result<Vec<Subscription>> {
    let subs = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT * FROM subscriptions
        WHERE user_id = ?
        ORDER BY renewal_date ASC, id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(subs)
}

pub async fn count_subscriptions(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Insert a subscription unless the user is unpaid and at the free-tier limit
///
/// The limit check and the insert are one statement, so concurrent adds cannot
/// overshoot the limit. `Ok(None)` means the limit was reached and nothing was written.
pub async fn insert_subscription(
    pool: &SqlitePool,
    user_id: &str,
    new: &NewSubscription,
) -> Result<Option<Subscription>> {
    let now = Utc::now();
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions (
            user_id, name, renewal_date, seats, cost_per_seat,
            remind_5d, remind_2d, remind_1d, remind_1h, created_at, updated_at
        )
        SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
        WHERE EXISTS (SELECT 1 FROM user_payments WHERE user_id = ? AND has_paid = 1)
           OR (SELECT COUNT(*) FROM subscriptions WHERE user_id = ?) < ?
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&new.name)
    .bind(new.renewal_date)
    .bind(new.seats)
    .bind(new.cost_per_seat)
    .bind(new.reminders.five_days)
    .bind(new.reminders.two_days)
    .bind(new.reminders.one_day)
    .bind(new.reminders.one_hour)
    .bind(now)
    .bind(now)
    .bind(user_id)
    .bind(user_id)
    .bind(FREE_SUBSCRIPTION_LIMIT)
    .fetch_optional(pool)
    .await?;
    Ok(sub)
}

/// Apply a partial update; `Ok(None)` if the row does not exist for this user
pub async fn update_subscription(
    pool: &SqlitePool,
    user_id: &str,
    id: i64,
    patch: &SubscriptionPatch,
) -> Result<Option<Subscription>> {
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions
        SET
            name = COALESCE(?, name),
            renewal_date = COALESCE(?, renewal_date),
            seats = COALESCE(?, seats),
            cost_per_seat = COALESCE(?, cost_per_seat),
            remind_5d = COALESCE(?, remind_5d),
            remind_2d = COALESCE(?, remind_2d),
            remind_1d = COALESCE(?, remind_1d),
            remind_1h = COALESCE(?, remind_1h),
            updated_at = ?
        WHERE user_id = ? AND id = ?
        RETURNING *
        "#,
    )
    .bind(patch.name.as_deref())
    .bind(patch.renewal_date)
    .bind(patch.seats)
    .bind(patch.cost_per_seat)
    .bind(patch.remind_5d)
    .bind(patch.remind_2d)
    .bind(patch.remind_1d)
    .bind(patch.remind_1h)
    .bind(Utc::now())
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(sub)
}

/// Delete a user's subscription, returning whether a row was removed
pub async fn delete_subscription(pool: &SqlitePool, user_id: &str, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
