//! UI serving routes
//!
//! Pages and assets are embedded in the binary.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::AppState;

const INDEX_HTML: &str = include_str!("../ui/index.html");
const CATALOG_HTML: &str = include_str!("../ui/catalog.html");
const PAYMENT_SUCCESS_HTML: &str = include_str!("../ui/payment_success.html");
const APP_JS: &str = include_str!("../ui/app.js");
const APP_CSS: &str = include_str!("../ui/app.css");

/// GET /
///
/// Sign in / sign up, the subscription manager and the unlock dialog
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /catalog
pub async fn serve_catalog() -> Html<&'static str> {
    Html(CATALOG_HTML)
}

/// GET /payment/success
///
/// Verifies the Checkout session from `?session_id=` client-side, then
/// returns home.
pub async fn serve_payment_success() -> Html<&'static str> {
    Html(PAYMENT_SUCCESS_HTML)
}

/// GET /static/app.js
pub async fn serve_app_js() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        APP_JS,
    )
        .into_response()
}

/// GET /static/app.css
pub async fn serve_app_css() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css")],
        APP_CSS,
    )
        .into_response()
}

pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(serve_index))
        .route("/catalog", get(serve_catalog))
        .route("/payment/success", get(serve_payment_success))
        .route("/static/app.js", get(serve_app_js))
        .route("/static/app.css", get(serve_app_css))
}
