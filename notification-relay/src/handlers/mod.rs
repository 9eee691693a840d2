//! HTTP handlers for notification-relay.

pub mod health;
pub mod relay;

pub use health::{health_check, metrics_endpoint};
pub use relay::{method_not_allowed, send_notification};
