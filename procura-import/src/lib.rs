//! procura-import library interface
//!
//! Bulk import of public procurement spreadsheet exports. Exposes the
//! pipeline and the HTTP router for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, ImportError};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::api::ActiveContexts;
use crate::config::ImportConfig;
use crate::db::ImportStore;
use crate::services::{ImportOrchestrator, WorkbookSource};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Record and alert storage
    pub store: Arc<dyn ImportStore>,
    /// Pipeline entry point shared by all jobs
    pub orchestrator: Arc<ImportOrchestrator>,
    pub config: Arc<ImportConfig>,
    /// Context codes with a job in flight
    pub active_contexts: ActiveContexts,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last job failure for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ImportStore>,
        source: Arc<dyn WorkbookSource>,
        config: ImportConfig,
    ) -> Self {
        let config = Arc::new(config);
        let orchestrator = Arc::new(ImportOrchestrator::new(
            Arc::clone(&store),
            source,
            Arc::clone(&config),
        ));
        Self {
            store,
            orchestrator,
            config,
            active_contexts: ActiveContexts::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
