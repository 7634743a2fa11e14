//! Storage access for procura-import
//!
//! The pipeline talks to storage only through [`ImportStore`], so the batch
//! persister can be exercised against an in-memory store that injects
//! failures. [`SqliteImportStore`] is the production implementation.

pub mod sqlite_store;

pub use sqlite_store::SqliteImportStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AlertKey, BrandAlert, CanonicalRecord};

/// Storage error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness constraint hit (e.g. alert for the same order and brand)
    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure reported by a non-SQL backend
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Downstream store for canonical records and brand alerts
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Delete every record stored under the context code; returns the count
    async fn delete_records_for_context(&self, context_code: &str) -> StoreResult<u64>;

    /// Insert a batch of records atomically
    async fn insert_records(&self, records: &[CanonicalRecord]) -> StoreResult<u64>;

    async fn insert_record(&self, record: &CanonicalRecord) -> StoreResult<()>;

    /// Alerts already stored for any of the given business keys
    async fn existing_alert_keys(&self, business_keys: &[String]) -> StoreResult<Vec<AlertKey>>;

    async fn alert_exists(&self, key: &AlertKey) -> StoreResult<bool>;

    /// Insert a batch of alerts atomically
    async fn insert_alerts(&self, alerts: &[BrandAlert]) -> StoreResult<u64>;

    /// Insert one alert; [`StoreError::Conflict`] when it already exists
    async fn insert_alert(&self, alert: &BrandAlert) -> StoreResult<()>;

    async fn count_records_for_context(&self, context_code: &str) -> StoreResult<u64>;
}
