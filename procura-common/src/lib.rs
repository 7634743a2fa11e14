//! # Procura Common Library
//!
//! Shared code for the procura services including:
//! - Error and result types
//! - Bootstrap configuration loading (root folder, TOML)
//! - Import event types and the progress emitter
//! - SSE adapters for import event streams
//! - Database initialization

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
