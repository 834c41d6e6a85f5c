//! HTTP API handlers for reaper-web

pub mod auth;
pub mod buildinfo;
pub mod catalog;
pub mod health;
pub mod payment;
pub mod session;
pub mod subscriptions;
pub mod ui;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use session::{require_session, CurrentUser};
pub use ui::ui_routes;
