//! Shared API request/response types
//!
//! Client-facing shapes are camelCase; database rows stay snake_case
//! (see `db::models`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Subscription, User};
use crate::renewal::{self, Reminders, RenewalSeverity};

// ========================================
// Error Response Types
// ========================================

/// Error body returned by every failing endpoint
///
/// # Examples
///
/// ```
/// use reaper_common::api::types::ErrorResponse;
///
/// let body = serde_json::to_string(&ErrorResponse::new("Unauthorized")).unwrap();
/// assert_eq!(body, r#"{"error":"Unauthorized"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

// ========================================
// User Types
// ========================================

/// Public view of a user (never includes password material)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

// ========================================
// Subscription Types
// ========================================

/// Subscription as rendered by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    /// Stringified row id
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub renewal_date: NaiveDate,
    pub seats: i64,
    pub seat_cost: f64,
    pub total_cost: f64,
    pub reminders: Reminders,
    pub days_until_renewal: i64,
    pub renewal_status: RenewalSeverity,
    pub renewal_label: String,
    pub next_reminder_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionView {
    /// Build the client view, computing countdown fields relative to `now`
    pub fn from_model(sub: Subscription, now: DateTime<Utc>) -> Self {
        let reminders = sub.reminders();
        let days = renewal::days_until_renewal(sub.renewal_date, now);
        let status = renewal::renewal_status(days);

        Self {
            id: sub.id.to_string(),
            total_cost: renewal::subscription_cost(sub.seats, sub.cost_per_seat),
            next_reminder_at: renewal::next_reminder_at(sub.renewal_date, &reminders, now),
            user_id: sub.user_id,
            name: sub.name,
            renewal_date: sub.renewal_date,
            seats: sub.seats,
            seat_cost: sub.cost_per_seat,
            reminders,
            days_until_renewal: days,
            renewal_status: status.severity,
            renewal_label: status.label,
            created_at: sub.created_at,
            updated_at: sub.updated_at,
        }
    }
}

/// Free-tier status for the current user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
    pub has_paid: bool,
    pub subscription_count: i64,
}
