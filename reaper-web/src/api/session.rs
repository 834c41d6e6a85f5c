//! Session cookie handling and the session middleware
//!
//! The `session` cookie holds an opaque token; the middleware resolves it to
//! a user and stores [`CurrentUser`] in the request extensions.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use reaper_common::api::{ErrorResponse, SESSION_MAX_AGE_SECS};
use reaper_common::db::{sessions, User};
use tracing::{debug, error};

use crate::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Authenticated user for the current request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Session token from the request's `Cookie` headers
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value starting a session
pub fn session_cookie(token: &str, secure: bool) -> String {
    cookie_value(token, SESSION_MAX_AGE_SECS, secure)
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    cookie_value("", 0, secure)
}

fn cookie_value(token: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Resolve the request's session to a user, if any
///
/// Lookup failures are logged and treated as "no user".
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let token = session_token(headers)?;
    match sessions::get_session_user(&state.db, &token).await {
        Ok(user) => user,
        Err(e) => {
            error!("Session lookup failed: {}", e);
            None
        }
    }
}

/// Session middleware for protected routes
///
/// Returns 401 `{"error":"Unauthorized"}` without a valid session.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match current_user(&state, request.headers()).await {
        Some(user) => {
            debug!(user_id = %user.id, path = %request.uri().path(), "Authenticated request");
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        None => unauthorized(),
    }
}

pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("Unauthorized")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc123; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_empty_session_cookie_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        assert_eq!(
            session_cookie("tok", false),
            "session=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800"
        );
        assert!(session_cookie("tok", true).ends_with("; Secure"));
        assert_eq!(
            clear_session_cookie(false),
            "session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
        );
    }
}
