//! Unlock payment endpoints and the Stripe webhook
//!
//! A user is marked paid only after the provider reports the charge as
//! succeeded (or the checkout as paid) for that same user.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use reaper_common::api::ErrorResponse;
use reaper_common::db::payments::record_payment;
use reaper_common::plan::{UNLOCK_CURRENCY, UNLOCK_PRICE_CENTS};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use super::session::CurrentUser;
use crate::payments::webhook::{verify_signature, PaymentEvent, WebhookEvent, SIGNATURE_HEADER};
use crate::payments::{
    is_object_id, ChargeRequest, CheckoutRequest, PaymentError, PaymentProvider,
    CHECKOUT_SESSION_PREFIX, PAYMENT_INTENT_PREFIX,
};
use crate::AppState;

pub const UNLOCK_PRODUCT_NAME: &str = "Reaper's List: unlimited subscriptions";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub publishable_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    #[serde(alias = "payment_intent_id")]
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCheckoutRequest {
    #[serde(alias = "session_id")]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentResult {
    pub success: bool,
}

#[derive(Debug)]
pub enum PaymentApiError {
    NotConfigured,
    WebhookNotConfigured,
    InvalidInput(String),
    InvalidSignature(String),
    Provider(PaymentError),
    Database(String),
}

impl From<PaymentError> for PaymentApiError {
    fn from(e: PaymentError) -> Self {
        PaymentApiError::Provider(e)
    }
}

impl From<reaper_common::Error> for PaymentApiError {
    fn from(e: reaper_common::Error) -> Self {
        PaymentApiError::Database(e.to_string())
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PaymentApiError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Payments are not configured".to_string(),
            ),
            PaymentApiError::WebhookNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Webhook secret is not configured".to_string(),
            ),
            PaymentApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            PaymentApiError::InvalidSignature(reason) => {
                warn!("Rejected webhook: {}", reason);
                (StatusCode::BAD_REQUEST, "Invalid signature".to_string())
            }
            PaymentApiError::Provider(e) => {
                error!("Payment provider error: {}", e);
                (StatusCode::BAD_GATEWAY, "Payment provider error".to_string())
            }
            PaymentApiError::Database(msg) => {
                error!("Payment database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

fn provider(state: &AppState) -> Result<Arc<dyn PaymentProvider>, PaymentApiError> {
    state.payments.clone().ok_or(PaymentApiError::NotConfigured)
}

fn unlock_charge(user_id: &str) -> ChargeRequest {
    ChargeRequest {
        user_id: user_id.to_string(),
        amount_cents: UNLOCK_PRICE_CENTS,
        currency: UNLOCK_CURRENCY.to_string(),
    }
}

/// Reject ids that are not plain Stripe object ids before they reach a request path
fn require_object_id(id: &str, prefix: &str, what: &str) -> Result<(), PaymentApiError> {
    if is_object_id(id, prefix) {
        Ok(())
    } else {
        warn!(id = %id, "Rejected malformed {}", what);
        Err(PaymentApiError::InvalidInput(format!("Invalid {}", what)))
    }
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, PaymentApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| PaymentApiError::InvalidInput(rejection.body_text()))
}

/// POST /api/payment/intent
pub async fn create_intent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<PaymentIntentResponse>, PaymentApiError> {
    let intent = provider(&state)?
        .create_payment_intent(&unlock_charge(&user.id))
        .await?;

    let client_secret = intent.client_secret.ok_or_else(|| {
        PaymentApiError::Provider(PaymentError::Parse(
            "payment intent without client_secret".to_string(),
        ))
    })?;

    Ok(Json(PaymentIntentResponse {
        client_secret,
        publishable_key: state.publishable_key.clone(),
    }))
}

/// POST /api/payment/confirm
pub async fn confirm(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<Json<PaymentResult>, PaymentApiError> {
    let request = parse_body(payload)?;
    require_object_id(&request.payment_intent_id, PAYMENT_INTENT_PREFIX, "payment intent id")?;
    let intent = provider(&state)?
        .retrieve_payment_intent(&request.payment_intent_id)
        .await?;

    if !intent.succeeded() {
        info!(user_id = %user.id, intent_id = %intent.id, status = %intent.status, "Payment not completed");
        return Ok(Json(PaymentResult { success: false }));
    }
    if intent.user_id() != Some(user.id.as_str()) {
        warn!(
            user_id = %user.id,
            intent_id = %intent.id,
            owner = ?intent.user_id(),
            "Payment intent belongs to another user"
        );
        return Ok(Json(PaymentResult { success: false }));
    }

    record_payment(&state.db, &user.id, &intent.id).await?;
    info!(user_id = %user.id, intent_id = %intent.id, "Payment confirmed");
    Ok(Json(PaymentResult { success: true }))
}

/// POST /api/payment/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<CheckoutResponse>, PaymentApiError> {
    let request = CheckoutRequest {
        charge: unlock_charge(&user.id),
        product_name: UNLOCK_PRODUCT_NAME.to_string(),
        success_url: format!(
            "{}/payment/success?session_id={{CHECKOUT_SESSION_ID}}",
            state.public_url
        ),
        cancel_url: format!("{}/", state.public_url),
    };

    let session = provider(&state)?.create_checkout_session(&request).await?;
    let url = session.url.clone().ok_or_else(|| {
        PaymentApiError::Provider(PaymentError::Parse(
            "checkout session without url".to_string(),
        ))
    })?;

    Ok(Json(CheckoutResponse {
        url,
        session_id: session.id,
    }))
}

/// POST /api/payment/checkout/verify
pub async fn verify_checkout(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<VerifyCheckoutRequest>, JsonRejection>,
) -> Result<Json<PaymentResult>, PaymentApiError> {
    let request = parse_body(payload)?;
    require_object_id(&request.session_id, CHECKOUT_SESSION_PREFIX, "checkout session id")?;
    let session = provider(&state)?
        .retrieve_checkout_session(&request.session_id)
        .await?;

    if !session.is_paid() {
        info!(user_id = %user.id, session_id = %session.id, "Checkout not paid");
        return Ok(Json(PaymentResult { success: false }));
    }
    if session.user_id() != Some(user.id.as_str()) {
        warn!(
            user_id = %user.id,
            session_id = %session.id,
            owner = ?session.user_id(),
            "Checkout session belongs to another user"
        );
        return Ok(Json(PaymentResult { success: false }));
    }

    record_payment(&state.db, &user.id, session.payment_reference()).await?;
    info!(user_id = %user.id, session_id = %session.id, "Checkout verified");
    Ok(Json(PaymentResult { success: true }))
}

/// POST /api/payment/webhook
///
/// Authenticated by the `Stripe-Signature` header, not by session.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, PaymentApiError> {
    let secret = state
        .webhook_secret
        .as_deref()
        .ok_or(PaymentApiError::WebhookNotConfigured)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PaymentApiError::InvalidSignature("missing signature header".to_string()))?;

    verify_signature(&body, signature, secret, Utc::now().timestamp())
        .map_err(|e| PaymentApiError::InvalidSignature(e.to_string()))?;

    let event = WebhookEvent::parse(&body)
        .and_then(WebhookEvent::into_payment_event)
        .map_err(|e| PaymentApiError::InvalidInput(format!("Invalid event: {}", e)))?;

    let paid = match event {
        PaymentEvent::IntentSucceeded(intent) => intent
            .user_id()
            .map(|user_id| (user_id.to_string(), intent.id.clone())),
        PaymentEvent::CheckoutCompleted(session) if session.is_paid() => session
            .user_id()
            .map(|user_id| (user_id.to_string(), session.payment_reference().to_string())),
        PaymentEvent::CheckoutCompleted(session) => {
            info!(session_id = %session.id, "Checkout completed without payment");
            None
        }
        PaymentEvent::Ignored(event_type) => {
            info!(event_type = %event_type, "Ignoring webhook event");
            None
        }
    };

    if let Some((user_id, reference)) = paid {
        match record_payment(&state.db, &user_id, &reference).await {
            Ok(()) => info!(user_id = %user_id, reference = %reference, "Payment recorded from webhook"),
            // Unknown user: acknowledge so the provider stops retrying
            Err(reaper_common::Error::Database(ref e))
                if reaper_common::Error::is_foreign_key_violation(e) =>
            {
                warn!(user_id = %user_id, "Webhook payment for unknown user");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok((StatusCode::OK, Json(json!({ "received": true }))).into_response())
}
