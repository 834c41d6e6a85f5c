//! Stripe REST client
//!
//! Form-encoded requests authenticated with the secret key.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{
    ChargeRequest, CheckoutRequest, CheckoutSession, PaymentError, PaymentIntent, PaymentProvider,
    USER_ID_METADATA_KEY,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const USER_AGENT: &str = concat!("reaper-web/", env!("CARGO_PKG_VERSION"));

pub struct StripeClient {
    http_client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Result<Self, PaymentError> {
        Self::with_base_url(secret_key, STRIPE_API_BASE)
    }

    /// Client against another API root (stripe-mock, proxies)
    pub fn with_base_url(
        secret_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            secret_key: secret_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Stripe POST");

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Stripe GET");

        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

/// Form fields for a PaymentIntent
fn payment_intent_form(request: &ChargeRequest) -> Vec<(String, String)> {
    vec![
        ("amount".to_string(), request.amount_cents.to_string()),
        ("currency".to_string(), request.currency.clone()),
        (
            format!("metadata[{}]", USER_ID_METADATA_KEY),
            request.user_id.clone(),
        ),
        ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
    ]
}

/// Form fields for a one-line payment-mode Checkout Session
fn checkout_session_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let charge = &request.charge;
    vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("client_reference_id".to_string(), charge.user_id.clone()),
        (
            format!("metadata[{}]", USER_ID_METADATA_KEY),
            charge.user_id.clone(),
        ),
        (
            format!("payment_intent_data[metadata][{}]", USER_ID_METADATA_KEY),
            charge.user_id.clone(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            charge.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            charge.amount_cents.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.product_name.clone(),
        ),
    ]
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_payment_intent(&self, request: &ChargeRequest) -> Result<PaymentIntent, PaymentError> {
        let intent: PaymentIntent = self
            .post_form("/payment_intents", &payment_intent_form(request))
            .await?;
        tracing::info!(user_id = %request.user_id, intent_id = %intent.id, "Created payment intent");
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        self.get(&format!("/payment_intents/{}", id)).await
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let session: CheckoutSession = self
            .post_form("/checkout/sessions", &checkout_session_form(request))
            .await?;
        tracing::info!(
            user_id = %request.charge.user_id,
            session_id = %session.id,
            "Created checkout session"
        );
        Ok(session)
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, PaymentError> {
        self.get(&format!("/checkout/sessions/{}", id)).await
    }
}
