//! reaper-web library - Reaper's List HTTP service
//!
//! Session-authenticated JSON API for tracking SaaS subscriptions, the Stripe
//! unlock flow, the public catalog and the embedded UI.

use std::sync::Arc;

use axum::Router;
use reaper_common::config::AppConfig;
use sqlx::SqlitePool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod payments;

use payments::{PaymentError, PaymentProvider, StripeClient};

/// Maximum accepted request body (1 MiB)
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// `None` when Stripe is not configured; payment endpoints answer 503
    pub payments: Option<Arc<dyn PaymentProvider>>,
    pub publishable_key: Option<String>,
    pub webhook_secret: Option<String>,
    /// Base URL used in Checkout redirect links, without trailing slash
    pub public_url: String,
    /// Add `Secure` to session cookies
    pub secure_cookies: bool,
}

impl AppState {
    /// State with payments disabled
    pub fn new(db: SqlitePool, public_url: impl Into<String>) -> Self {
        Self {
            db,
            payments: None,
            publishable_key: None,
            webhook_secret: None,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            secure_cookies: false,
        }
    }

    /// State from resolved configuration; builds the Stripe client when enabled
    pub fn from_config(db: SqlitePool, config: &AppConfig) -> Result<Self, PaymentError> {
        let mut state = Self::new(db, config.public_url.clone())
            .with_secure_cookies(config.secure_cookies);
        state.publishable_key = config.stripe.publishable_key.clone();
        state.webhook_secret = config.stripe.webhook_secret.clone();

        if config.stripe.is_enabled() {
            if let Some(secret_key) = &config.stripe.secret_key {
                state.payments = Some(Arc::new(StripeClient::new(secret_key.clone())?));
            }
        }

        Ok(state)
    }

    pub fn with_payments(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.payments = Some(provider);
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }
}

/// Build application router
///
/// Health, auth entry points, payment status, the catalog, the webhook and
/// the UI are public. Everything else requires a session.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, patch, post};

    let protected = Router::new()
        .route("/api/auth/me", get(api::auth::me))
        .route(
            "/api/subscriptions",
            get(api::subscriptions::list).post(api::subscriptions::add),
        )
        .route("/api/subscriptions/summary", get(api::subscriptions::summary))
        .route(
            "/api/subscriptions/:id",
            patch(api::subscriptions::update).delete(api::subscriptions::delete),
        )
        .route("/api/payment/intent", post(api::payment::create_intent))
        .route("/api/payment/confirm", post(api::payment::confirm))
        .route("/api/payment/checkout", post(api::payment::create_checkout))
        .route("/api/payment/checkout/verify", post(api::payment::verify_checkout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_session,
        ));

    let public = Router::new()
        .route("/api/auth/signup", post(api::auth::sign_up))
        .route("/api/auth/signin", post(api::auth::sign_in))
        .route("/api/auth/signout", post(api::auth::sign_out))
        .route("/api/subscriptions/status", get(api::subscriptions::payment_status))
        .route("/api/catalog", get(api::catalog::search))
        .route("/api/payment/webhook", post(api::payment::webhook))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::ui_routes())
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
