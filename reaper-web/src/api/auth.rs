//! Account endpoints: sign up, sign in, sign out, current user

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use reaper_common::api::types::UserView;
use reaper_common::api::ErrorResponse;
use reaper_common::db::{sessions, users, User};
use reaper_common::Error;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::session::{clear_session_cookie, session_cookie, session_token, CurrentUser};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserView,
}

/// Auth errors; the messages are shown to the user as-is
#[derive(Debug)]
pub enum AuthError {
    MissingSignUpFields,
    MissingCredentials,
    EmailTaken,
    InvalidCredentials,
    SignUpFailed(String),
    SignInFailed(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingSignUpFields => (StatusCode::BAD_REQUEST, "All fields are required"),
            AuthError::MissingCredentials => {
                (StatusCode::BAD_REQUEST, "Email and password are required")
            }
            AuthError::EmailTaken => (
                StatusCode::CONFLICT,
                "An account with this email already exists. Please sign in instead.",
            ),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password. Please check your credentials and try again.",
            ),
            AuthError::SignUpFailed(reason) => {
                error!("Sign up failed: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create account. Please try again.",
                )
            }
            AuthError::SignInFailed(reason) => {
                error!("Sign in failed: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to sign in. Please try again.",
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Trimmed, non-empty field
fn required(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Password with at least one non-whitespace character, kept as typed
fn required_password(field: Option<String>) -> Option<String> {
    field.filter(|p| !p.trim().is_empty())
}

/// Response carrying the user and a fresh session cookie
fn with_session(status: StatusCode, user: User, token: &str, secure: bool) -> Response {
    (
        status,
        [(header::SET_COOKIE, session_cookie(token, secure))],
        Json(UserResponse { user: user.into() }),
    )
        .into_response()
}

/// POST /api/auth/signup
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();

    let (Some(email), Some(name)) = (required(request.email), required(request.name)) else {
        return Err(AuthError::MissingSignUpFields);
    };
    let Some(password) = required_password(request.password) else {
        return Err(AuthError::MissingSignUpFields);
    };

    let user = match users::create_user(&state.db, &email, &password, &name).await {
        Ok(user) => user,
        Err(Error::Conflict(_)) => return Err(AuthError::EmailTaken),
        Err(e) => return Err(AuthError::SignUpFailed(e.to_string())),
    };

    let token = sessions::create_session(&state.db, &user.id)
        .await
        .map_err(|e| AuthError::SignUpFailed(e.to_string()))?;

    info!(user_id = %user.id, "Account created");
    Ok(with_session(StatusCode::CREATED, user, &token, state.secure_cookies))
}

/// POST /api/auth/signin
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();

    let email = required(request.email).ok_or(AuthError::MissingCredentials)?;
    let password = required_password(request.password).ok_or(AuthError::MissingCredentials)?;

    let user = users::verify_user(&state.db, &email, &password)
        .await
        .map_err(|e| AuthError::SignInFailed(e.to_string()))?
        .ok_or(AuthError::InvalidCredentials)?;

    let token = sessions::create_session(&state.db, &user.id)
        .await
        .map_err(|e| AuthError::SignInFailed(e.to_string()))?;

    info!(user_id = %user.id, "Signed in");
    Ok(with_session(StatusCode::OK, user, &token, state.secure_cookies))
}

/// POST /api/auth/signout
///
/// Always succeeds and clears the cookie, with or without a session.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = sessions::delete_session(&state.db, &token).await {
            error!("Failed to delete session: {}", e);
        }
    }

    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie(state.secure_cookies))],
    )
        .into_response()
}

/// GET /api/auth/me
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse { user: user.into() })
}
