//! Payment provider integration
//!
//! Handlers talk to a [`PaymentProvider`]; production uses [`StripeClient`],
//! tests substitute an in-process fake.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub mod stripe;
pub mod webhook;

pub use stripe::StripeClient;

/// Metadata key carrying the paying user's id
pub const USER_ID_METADATA_KEY: &str = "user_id";

pub const PAYMENT_INTENT_PREFIX: &str = "pi_";
pub const CHECKOUT_SESSION_PREFIX: &str = "cs_";

/// True for a Stripe object id with the given prefix, e.g. `pi_3Nx...`
///
/// Ids are placed in request paths, so only ASCII alphanumerics and `_` are allowed.
pub fn is_object_id(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix).is_some_and(|rest| {
        !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}

/// Payment provider errors
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Subset of a Stripe PaymentIntent used here
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get(USER_ID_METADATA_KEY).map(String::as_str)
    }

    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

/// Subset of a Stripe Checkout Session used here
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: String,
    pub payment_intent: Option<String>,
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Owner from metadata, falling back to `client_reference_id`
    pub fn user_id(&self) -> Option<&str> {
        self.metadata
            .get(USER_ID_METADATA_KEY)
            .map(String::as_str)
            .or(self.client_reference_id.as_deref())
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Id recorded against the payment: the intent if present, else the session
    pub fn payment_reference(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }
}

/// One-time charge for a user
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub user_id: String,
    pub amount_cents: i64,
    pub currency: String,
}

/// Hosted checkout for a one-time charge
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub charge: ChargeRequest,
    pub product_name: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment_intent(&self, request: &ChargeRequest) -> Result<PaymentIntent, PaymentError>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError>;

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, PaymentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_object_id() {
        assert!(is_object_id("pi_3NxAbc123", PAYMENT_INTENT_PREFIX));
        assert!(is_object_id("cs_test_a1B2c3", CHECKOUT_SESSION_PREFIX));

        assert!(!is_object_id("pi_", PAYMENT_INTENT_PREFIX));
        assert!(!is_object_id("cs_test_a1", PAYMENT_INTENT_PREFIX));
        assert!(!is_object_id("../charges/ch_x", PAYMENT_INTENT_PREFIX));
        assert!(!is_object_id("pi_1/../../charges", PAYMENT_INTENT_PREFIX));
        assert!(!is_object_id("pi_1?expand[]=customer", PAYMENT_INTENT_PREFIX));
        assert!(!is_object_id("pi_1%2F..", PAYMENT_INTENT_PREFIX));
    }

    #[test]
    fn test_checkout_session_owner_and_reference() {
        let mut session = CheckoutSession {
            id: "cs_1".to_string(),
            payment_status: "paid".to_string(),
            client_reference_id: Some("user-a".to_string()),
            ..Default::default()
        };
        assert!(session.is_paid());
        assert_eq!(session.user_id(), Some("user-a"));
        assert_eq!(session.payment_reference(), "cs_1");

        session
            .metadata
            .insert(USER_ID_METADATA_KEY.to_string(), "user-b".to_string());
        session.payment_intent = Some("pi_1".to_string());
        assert_eq!(session.user_id(), Some("user-b"));
        assert_eq!(session.payment_reference(), "pi_1");
    }

    #[test]
    fn test_payment_intent_deserializes_from_stripe_json() {
        let intent: PaymentIntent = serde_json::from_str(
            r#"{"id":"pi_9","object":"payment_intent","status":"succeeded",
                "client_secret":"pi_9_secret","amount":997,
                "metadata":{"user_id":"u1"}}"#,
        )
        .unwrap();
        assert!(intent.succeeded());
        assert_eq!(intent.user_id(), Some("u1"));
        assert_eq!(intent.client_secret.as_deref(), Some("pi_9_secret"));
    }
}
