//! Shared helpers for reaper-web integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use reaper_common::db::init_memory_database;
use reaper_web::payments::{
    ChargeRequest, CheckoutRequest, CheckoutSession, PaymentError, PaymentIntent, PaymentProvider,
    USER_ID_METADATA_KEY,
};
use reaper_web::{build_router, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot`

pub const PUBLIC_URL: &str = "http://reaper.test";
pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";

/// In-process stand-in for Stripe
#[derive(Default)]
pub struct FakeProvider {
    pub intents: Mutex<HashMap<String, PaymentIntent>>,
    pub checkouts: Mutex<HashMap<String, CheckoutSession>>,
    pub charges: Mutex<Vec<ChargeRequest>>,
    pub checkout_requests: Mutex<Vec<CheckoutRequest>>,
}

fn metadata_for(user_id: &str) -> HashMap<String, String> {
    HashMap::from([(USER_ID_METADATA_KEY.to_string(), user_id.to_string())])
}

impl FakeProvider {
    pub fn add_intent(&self, id: &str, status: &str, user_id: &str) {
        self.intents.lock().unwrap().insert(
            id.to_string(),
            PaymentIntent {
                id: id.to_string(),
                status: status.to_string(),
                client_secret: Some(format!("{}_secret", id)),
                metadata: metadata_for(user_id),
            },
        );
    }

    pub fn add_checkout(&self, id: &str, payment_status: &str, user_id: &str) {
        self.checkouts.lock().unwrap().insert(
            id.to_string(),
            CheckoutSession {
                id: id.to_string(),
                url: Some(format!("https://checkout.stripe.test/{}", id)),
                payment_status: payment_status.to_string(),
                payment_intent: Some(format!("pi_for_{}", id)),
                client_reference_id: Some(user_id.to_string()),
                metadata: metadata_for(user_id),
            },
        );
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_payment_intent(&self, request: &ChargeRequest) -> Result<PaymentIntent, PaymentError> {
        let mut charges = self.charges.lock().unwrap();
        charges.push(request.clone());
        let id = format!("pi_fake_{}", charges.len());
        drop(charges);

        self.add_intent(&id, "requires_payment_method", &request.user_id);
        Ok(self.intents.lock().unwrap()[&id].clone())
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        self.intents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| PaymentError::Api(404, format!("No such payment_intent: {}", id)))
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut requests = self.checkout_requests.lock().unwrap();
        requests.push(request.clone());
        let id = format!("cs_fake_{}", requests.len());
        drop(requests);

        self.add_checkout(&id, "unpaid", &request.charge.user_id);
        Ok(self.checkouts.lock().unwrap()[&id].clone())
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, PaymentError> {
        self.checkouts
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| PaymentError::Api(404, format!("No such checkout session: {}", id)))
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub payments: Arc<FakeProvider>,
}

/// App over a fresh in-memory database with the fake provider and a webhook secret
pub async fn setup_app() -> TestApp {
    let db = init_memory_database().await.expect("Should create test database");
    let payments = Arc::new(FakeProvider::default());
    let state = AppState::new(db.clone(), PUBLIC_URL)
        .with_payments(payments.clone())
        .with_webhook_secret(WEBHOOK_SECRET);

    TestApp {
        router: build_router(state),
        db,
        payments,
    }
}

/// App with payments and webhooks unconfigured
pub async fn setup_app_without_payments() -> TestApp {
    let db = init_memory_database().await.expect("Should create test database");
    let state = AppState::new(db.clone(), PUBLIC_URL);

    TestApp {
        router: build_router(state),
        db,
        payments: Arc::new(FakeProvider::default()),
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.send(json_request(method, uri, cookie, body)).await
    }

    /// Create an account and return its `session=<token>` cookie
    pub async fn sign_up(&self, email: &str) -> String {
        let response = self
            .call(
                "POST",
                "/api/auth/signup",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": "hunter22",
                    "name": "Test User",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "signup failed: {}", response.text);
        session_cookie(&response.headers).expect("signup should set a session cookie")
    }

    /// Id of the user behind a session cookie
    pub async fn user_id(&self, cookie: &str) -> String {
        let response = self.call("GET", "/api/auth/me", Some(cookie), None).await;
        response.body["user"]["id"].as_str().unwrap().to_string()
    }

    pub async fn add_subscription(&self, cookie: &str, name: &str, date: &str) -> TestResponse {
        self.call(
            "POST",
            "/api/subscriptions",
            Some(cookie),
            Some(serde_json::json!({
                "name": name,
                "renewalDate": date,
                "seats": 2,
                "seatCost": 10.0,
                "reminders": {"fiveDays": true, "twoDays": false, "oneDay": false, "oneHour": false},
            })),
        )
        .await
    }
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// `session=<token>` from a Set-Cookie header
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}
