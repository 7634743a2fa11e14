//! Batched persistence with per-item fallback
//!
//! Records are written in fixed-size batches. A failed batch is reported
//! once and then retried record by record, so one bad record costs only
//! itself. Alerts are checked against what is already stored before being
//! written, and "already exists" is never an error: at most one alert per
//! (order, brand) survives any sequence of imports.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::{ImportStore, StoreError};
use crate::models::{AlertKey, BrandAlert, CanonicalRecord};

/// Result of persisting one chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    pub inserted_records: usize,
    pub inserted_alerts: usize,
    /// Business keys of records that failed individual insertion
    pub failed_record_keys: Vec<String>,
    /// Non-fatal error messages
    pub errors: Vec<String>,
}

impl PersistOutcome {
    fn merge(&mut self, other: PersistOutcome) {
        self.inserted_records += other.inserted_records;
        self.inserted_alerts += other.inserted_alerts;
        self.failed_record_keys.extend(other.failed_record_keys);
        self.errors.extend(other.errors);
    }
}

/// Writes records and alerts through an [`ImportStore`]
pub struct BatchPersister {
    store: Arc<dyn ImportStore>,
    record_batch_size: usize,
    alert_batch_size: usize,
}

impl BatchPersister {
    pub fn new(store: Arc<dyn ImportStore>, record_batch_size: usize, alert_batch_size: usize) -> Self {
        Self {
            store,
            record_batch_size: record_batch_size.max(1),
            alert_batch_size: alert_batch_size.max(1),
        }
    }

    /// Delete everything previously stored under the context code
    ///
    /// Must complete before the first insert of a job. Errors are returned
    /// to the caller, which treats them as fatal.
    pub async fn clear_context(&self, context_code: &str) -> Result<u64, StoreError> {
        let deleted = self.store.delete_records_for_context(context_code).await?;
        debug!(context = %context_code, deleted, "Cleared existing records for context");
        Ok(deleted)
    }

    /// Persist one chunk's records, then its alerts
    pub async fn persist_chunk(
        &self,
        records: &[CanonicalRecord],
        alerts: &[BrandAlert],
    ) -> PersistOutcome {
        let mut outcome = self.persist_records(records).await;
        outcome.merge(self.persist_alerts(alerts).await);
        outcome
    }

    /// Batch insert with individual fallback
    pub async fn persist_records(&self, records: &[CanonicalRecord]) -> PersistOutcome {
        let mut outcome = PersistOutcome::default();

        for batch in records.chunks(self.record_batch_size) {
            match self.store.insert_records(batch).await {
                Ok(_) => outcome.inserted_records += batch.len(),
                Err(e) => {
                    warn!(
                        batch_size = batch.len(),
                        error = %e,
                        "Record batch insert failed, retrying individually"
                    );
                    outcome.errors.push(format!("Batch insert failed: {}", e));

                    for record in batch {
                        match self.store.insert_record(record).await {
                            Ok(()) => outcome.inserted_records += 1,
                            Err(e) => {
                                debug!(
                                    business_key = %record.orden_electronica,
                                    error = %e,
                                    "Record insert failed"
                                );
                                outcome.failed_record_keys.push(record.orden_electronica.clone());
                            }
                        }
                    }
                }
            }
        }

        outcome
    }

    /// Insert alerts not already stored
    pub async fn persist_alerts(&self, alerts: &[BrandAlert]) -> PersistOutcome {
        let mut outcome = PersistOutcome::default();

        for batch in alerts.chunks(self.alert_batch_size) {
            let batch: Vec<&BrandAlert> = batch
                .iter()
                .filter(|a| !a.business_key.is_empty())
                .collect();
            if batch.is_empty() {
                continue;
            }

            let mut keys: Vec<String> = batch.iter().map(|a| a.business_key.clone()).collect();
            keys.sort();
            keys.dedup();

            match self.store.existing_alert_keys(&keys).await {
                Ok(existing) => {
                    let mut seen: HashSet<AlertKey> = existing.into_iter().collect();
                    let fresh: Vec<BrandAlert> = batch
                        .into_iter()
                        .filter(|a| seen.insert(a.key()))
                        .cloned()
                        .collect();
                    self.insert_alert_batch(&fresh, &mut outcome).await;
                }
                Err(e) => {
                    warn!(error = %e, "Existing alert lookup failed, checking alerts individually");
                    self.insert_alerts_checked(&batch, &mut outcome).await;
                }
            }
        }

        outcome
    }

    async fn insert_alert_batch(&self, fresh: &[BrandAlert], outcome: &mut PersistOutcome) {
        if fresh.is_empty() {
            return;
        }

        match self.store.insert_alerts(fresh).await {
            Ok(_) => outcome.inserted_alerts += fresh.len(),
            Err(e) => {
                warn!(
                    batch_size = fresh.len(),
                    error = %e,
                    "Alert batch insert failed, retrying individually"
                );
                for alert in fresh {
                    self.insert_alert_tolerant(alert, outcome).await;
                }
            }
        }
    }

    /// Existence check, then insert, per alert
    async fn insert_alerts_checked(&self, batch: &[&BrandAlert], outcome: &mut PersistOutcome) {
        let mut seen = HashSet::new();

        for alert in batch {
            let key = alert.key();
            if !seen.insert(key.clone()) {
                continue;
            }

            match self.store.alert_exists(&key).await {
                Ok(true) => continue,
                Ok(false) => self.insert_alert_tolerant(alert, outcome).await,
                Err(e) => outcome
                    .errors
                    .push(format!("Alert check failed for {}: {}", key.business_key, e)),
            }
        }
    }

    async fn insert_alert_tolerant(&self, alert: &BrandAlert, outcome: &mut PersistOutcome) {
        match self.store.insert_alert(alert).await {
            Ok(()) => outcome.inserted_alerts += 1,
            Err(e) if e.is_conflict() => {
                debug!(
                    business_key = %alert.business_key,
                    brand = %alert.brand_name,
                    "Alert already exists"
                );
            }
            Err(e) => outcome.errors.push(format!(
                "Alert insert failed for {} ({}): {}",
                alert.business_key, alert.brand_name, e
            )),
        }
    }
}
