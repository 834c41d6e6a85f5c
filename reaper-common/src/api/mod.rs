//! Shared HTTP API functionality
//!
//! Contains ONLY pure functions and shared types (no HTTP framework dependencies).
//! The web crate wraps these with axum handlers and middleware.

pub mod auth;
pub mod types;

pub use auth::{
    generate_salt, generate_session_token, hash_password, verify_password, SESSION_MAX_AGE_SECS,
};
pub use types::{ErrorResponse, SubscriptionView};
