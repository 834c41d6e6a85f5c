//! # Reaper's List Common Library
//!
//! Shared code for the Reaper's List service including:
//! - Database initialization, migrations, models and queries
//! - Password hashing and session tokens
//! - Configuration loading
//! - Renewal countdown, cost and reminder rules
//! - Free tier limits and unlock pricing

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod plan;
pub mod renewal;

pub use error::{Error, Result};
pub use renewal::Reminders;
