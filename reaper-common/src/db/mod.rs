//! Database models and queries

pub mod init;
pub mod migrations;
pub mod models;
pub mod payments;
pub mod products;
pub mod sessions;
pub mod subscriptions;
pub mod users;

pub use init::{init_database, init_memory_database};
pub use migrations::run_migrations;
pub use models::*;
