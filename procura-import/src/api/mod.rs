//! HTTP API handlers for procura-import

pub mod health;
pub mod import_process;

pub use health::health_routes;
pub use import_process::{import_routes, ActiveContexts, ContextGuard};
