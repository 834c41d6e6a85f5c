//! Database models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::renewal::Reminders;

/// Account row without password material
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Account row including password hash and salt (auth queries only)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub password_hash: String,
    pub password_salt: String,
}

impl From<UserCredentials> for User {
    fn from(c: UserCredentials) -> Self {
        Self {
            id: c.id,
            email: c.email,
            name: c.name,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub renewal_date: NaiveDate,
    pub seats: i64,
    pub cost_per_seat: f64,
    pub remind_5d: bool,
    pub remind_2d: bool,
    pub remind_1d: bool,
    pub remind_1h: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn reminders(&self) -> Reminders {
        Reminders {
            five_days: self.remind_5d,
            two_days: self.remind_2d,
            one_day: self.remind_1d,
            one_hour: self.remind_1h,
        }
    }
}

/// Validated input for inserting a subscription
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub name: String,
    pub renewal_date: NaiveDate,
    pub seats: i64,
    pub cost_per_seat: f64,
    pub reminders: Reminders,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionPatch {
    pub name: Option<String>,
    pub renewal_date: Option<NaiveDate>,
    pub seats: Option<i64>,
    pub cost_per_seat: Option<f64>,
    pub remind_5d: Option<bool>,
    pub remind_2d: Option<bool>,
    pub remind_1d: Option<bool>,
    pub remind_1h: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserPayment {
    pub id: i64,
    pub user_id: String,
    pub has_paid: bool,
    pub stripe_payment_intent_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Entry in the global SaaS catalog
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SaasProduct {
    pub id: String,
    pub name: String,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub default_cost: Option<f64>,
    pub created_at: DateTime<Utc>,
}
