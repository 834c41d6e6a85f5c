//! Stripe webhook signatures and events
//!
//! `Stripe-Signature: t=<unix>,v1=<hex hmac>[,v1=...]` where the HMAC-SHA256
//! is computed over `"{t}.{raw body}"` with the endpoint secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use super::{CheckoutSession, PaymentIntent};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed timestamp
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Malformed signature header")]
    MalformedHeader,

    #[error("Missing timestamp")]
    MissingTimestamp,

    #[error("Missing v1 signature")]
    MissingSignature,

    #[error("Timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("Signature mismatch")]
    Mismatch,
}

/// Verify a signature header against the raw request body
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let (key, value) = part.trim().split_once('=').ok_or(SignatureError::MalformedHeader)?;
        match key {
            "t" => timestamp = Some(value),
            // Undecodable candidates are skipped, they can never match
            "v1" => signatures.extend(hex::decode(value).ok()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    if (now_unix - signed_at).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok());
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Signature header value for a payload (used to sign test fixtures)
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={}", timestamp),
    };
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Payment-relevant meaning of a webhook event
#[derive(Debug)]
pub enum PaymentEvent {
    IntentSucceeded(PaymentIntent),
    CheckoutCompleted(CheckoutSession),
    Ignored(String),
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn into_payment_event(self) -> Result<PaymentEvent, serde_json::Error> {
        Ok(match self.event_type.as_str() {
            "payment_intent.succeeded" => {
                PaymentEvent::IntentSucceeded(serde_json::from_value(self.data.object)?)
            }
            "checkout.session.completed" => {
                PaymentEvent::CheckoutCompleted(serde_json::from_value(self.data.object)?)
            }
            _ => PaymentEvent::Ignored(self.event_type),
        })
    }
}
