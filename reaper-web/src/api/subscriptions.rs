//! Subscription endpoints
//!
//! Every query is scoped to the session user. Adding beyond the free tier
//! without an unlock answers 402 `PAYMENT_REQUIRED`.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use reaper_common::api::types::PaymentStatus;
use reaper_common::api::{ErrorResponse, SubscriptionView};
use reaper_common::db::{payments, subscriptions, NewSubscription, SubscriptionPatch};
use reaper_common::plan::limit_reached;
use reaper_common::renewal::{currency_symbol, format_amount, parse_renewal_date, total_monthly_cost};
use reaper_common::Reminders;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::session::{current_user, CurrentUser};
use crate::AppState;

/// Nested camelCase reminder flags
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderInput {
    pub five_days: Option<bool>,
    pub two_days: Option<bool>,
    pub one_day: Option<bool>,
    pub one_hour: Option<bool>,
}

/// Subscription fields as sent by clients
///
/// Both the camelCase view names and the snake_case column names are
/// accepted. When a field is given both ways the snake_case value wins.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInput {
    pub name: Option<String>,
    pub renewal_date: Option<String>,
    #[serde(rename = "renewal_date")]
    pub renewal_date_column: Option<String>,
    pub seats: Option<i64>,
    pub seat_cost: Option<f64>,
    #[serde(rename = "cost_per_seat")]
    pub cost_per_seat: Option<f64>,
    pub reminders: Option<ReminderInput>,
    #[serde(rename = "remind_5d")]
    pub remind_5d: Option<bool>,
    #[serde(rename = "remind_2d")]
    pub remind_2d: Option<bool>,
    #[serde(rename = "remind_1d")]
    pub remind_1d: Option<bool>,
    #[serde(rename = "remind_1h")]
    pub remind_1h: Option<bool>,
}

impl SubscriptionInput {
    /// Validated partial update
    pub fn into_patch(self) -> Result<SubscriptionPatch, SubscriptionError> {
        let name = match self.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(SubscriptionError::InvalidInput("Name is required".into()));
                }
                Some(name)
            }
            None => None,
        };

        let renewal_date = match self.renewal_date_column.or(self.renewal_date) {
            Some(raw) => Some(parse_renewal_date(&raw).ok_or_else(|| {
                SubscriptionError::InvalidInput(format!("Invalid renewal date: {}", raw))
            })?),
            None => None,
        };

        if let Some(seats) = self.seats {
            if seats < 1 {
                return Err(SubscriptionError::InvalidInput(
                    "Seats must be at least 1".into(),
                ));
            }
        }

        let cost_per_seat = self.cost_per_seat.or(self.seat_cost);
        if let Some(cost) = cost_per_seat {
            if !cost.is_finite() || cost < 0.0 {
                return Err(SubscriptionError::InvalidInput(
                    "Cost per seat must be a non-negative number".into(),
                ));
            }
        }

        let nested = self.reminders.unwrap_or_default();
        Ok(SubscriptionPatch {
            name,
            renewal_date,
            seats: self.seats,
            cost_per_seat,
            remind_5d: self.remind_5d.or(nested.five_days),
            remind_2d: self.remind_2d.or(nested.two_days),
            remind_1d: self.remind_1d.or(nested.one_day),
            remind_1h: self.remind_1h.or(nested.one_hour),
        })
    }

    /// Validated new subscription; every field but the reminders is required
    pub fn into_new(self) -> Result<NewSubscription, SubscriptionError> {
        let patch = self.into_patch()?;
        let missing = |field: &str| SubscriptionError::InvalidInput(format!("{} is required", field));

        Ok(NewSubscription {
            name: patch.name.ok_or_else(|| missing("Name"))?,
            renewal_date: patch.renewal_date.ok_or_else(|| missing("Renewal date"))?,
            seats: patch.seats.ok_or_else(|| missing("Seats"))?,
            cost_per_seat: patch.cost_per_seat.ok_or_else(|| missing("Cost per seat"))?,
            reminders: Reminders {
                five_days: patch.remind_5d.unwrap_or(false),
                two_days: patch.remind_2d.unwrap_or(false),
                one_day: patch.remind_1d.unwrap_or(false),
                one_hour: patch.remind_1h.unwrap_or(false),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub currency: Option<String>,
}

/// Cost overview for the subscription manager header
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub total_monthly_cost: f64,
    pub currency: String,
    pub currency_symbol: String,
    pub formatted_total: String,
    pub subscription_count: i64,
    pub has_paid: bool,
    pub limit_reached: bool,
}

#[derive(Debug)]
pub enum SubscriptionError {
    InvalidInput(String),
    PaymentRequired,
    NotFound,
    Database(String),
}

impl From<reaper_common::Error> for SubscriptionError {
    fn from(e: reaper_common::Error) -> Self {
        SubscriptionError::Database(e.to_string())
    }
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SubscriptionError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            SubscriptionError::PaymentRequired => {
                (StatusCode::PAYMENT_REQUIRED, "PAYMENT_REQUIRED".to_string())
            }
            SubscriptionError::NotFound => (
                StatusCode::NOT_FOUND,
                "Subscription not found or unauthorized".to_string(),
            ),
            SubscriptionError::Database(msg) => {
                error!("Subscription query failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

fn parse_body(
    payload: Result<Json<SubscriptionInput>, JsonRejection>,
) -> Result<SubscriptionInput, SubscriptionError> {
    payload
        .map(|Json(input)| input)
        .map_err(|rejection| SubscriptionError::InvalidInput(rejection.body_text()))
}

/// GET /api/subscriptions
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<SubscriptionView>>, SubscriptionError> {
    let now = Utc::now();
    let subs = subscriptions::list_subscriptions(&state.db, &user.id).await?;
    Ok(Json(
        subs.into_iter()
            .map(|sub| SubscriptionView::from_model(sub, now))
            .collect(),
    ))
}

/// POST /api/subscriptions
pub async fn add(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<SubscriptionInput>, JsonRejection>,
) -> Result<(StatusCode, Json<SubscriptionView>), SubscriptionError> {
    let status = payments::payment_status(&state.db, &user.id).await?;
    if limit_reached(status.has_paid, status.subscription_count) {
        info!(
            user_id = %user.id,
            count = status.subscription_count,
            "Free tier limit reached"
        );
        return Err(SubscriptionError::PaymentRequired);
    }

    let new = parse_body(payload)?.into_new()?;

    // A concurrent add may have used the last free slot since the check above
    let sub = subscriptions::insert_subscription(&state.db, &user.id, &new)
        .await?
        .ok_or_else(|| {
            info!(user_id = %user.id, "Free tier limit reached");
            SubscriptionError::PaymentRequired
        })?;
    info!(user_id = %user.id, subscription_id = sub.id, "Subscription added");

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionView::from_model(sub, Utc::now())),
    ))
}

/// PATCH /api/subscriptions/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<SubscriptionInput>, JsonRejection>,
) -> Result<Json<SubscriptionView>, SubscriptionError> {
    let id: i64 = id.parse().map_err(|_| SubscriptionError::NotFound)?;
    let patch = parse_body(payload)?.into_patch()?;

    let sub = subscriptions::update_subscription(&state.db, &user.id, id, &patch)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %user.id, subscription_id = id, "Update of missing or foreign subscription");
            SubscriptionError::NotFound
        })?;

    Ok(Json(SubscriptionView::from_model(sub, Utc::now())))
}

/// DELETE /api/subscriptions/:id
///
/// Deleting an id that does not exist (or is not the user's) is a no-op.
pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, SubscriptionError> {
    if let Ok(id) = id.parse::<i64>() {
        if subscriptions::delete_subscription(&state.db, &user.id, id).await? {
            info!(user_id = %user.id, subscription_id = id, "Subscription deleted");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/subscriptions/status
///
/// Public: without a session the answer is unpaid with no subscriptions.
pub async fn payment_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PaymentStatus>, SubscriptionError> {
    let Some(user) = current_user(&state, &headers).await else {
        return Ok(Json(PaymentStatus {
            has_paid: false,
            subscription_count: 0,
        }));
    };

    Ok(Json(payments::payment_status(&state.db, &user.id).await?))
}

/// GET /api/subscriptions/summary?currency=
pub async fn summary(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SubscriptionSummary>, SubscriptionError> {
    let currency = query
        .currency
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "USD".to_string());

    let (subs, has_paid) = tokio::try_join!(
        subscriptions::list_subscriptions(&state.db, &user.id),
        payments::has_paid(&state.db, &user.id),
    )?;

    let total = total_monthly_cost(subs.iter().map(|s| (s.seats, s.cost_per_seat)));
    let count = subs.len() as i64;

    Ok(Json(SubscriptionSummary {
        total_monthly_cost: total,
        currency_symbol: currency_symbol(&currency).to_string(),
        formatted_total: format_amount(&currency, total),
        currency,
        subscription_count: count,
        has_paid,
        limit_reached: limit_reached(has_paid, count),
    }))
}
