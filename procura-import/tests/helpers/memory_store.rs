//! In-memory `ImportStore` with injectable failures

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use procura_import::db::{ImportStore, StoreError, StoreResult};
use procura_import::models::{AlertKey, BrandAlert, CanonicalRecord};

/// Failures to inject; all off by default
#[derive(Debug, Default, Clone)]
pub struct Faults {
    /// Fail this many upcoming record batch inserts
    pub fail_record_batches: usize,
    /// Records with these business keys fail every insert (batch or single)
    pub failing_keys: HashSet<String>,
    pub fail_delete: bool,
    pub fail_alert_lookup: bool,
    pub fail_alert_batch: bool,
}

/// Call counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Calls {
    pub deletes: usize,
    pub record_batches: usize,
    pub single_records: usize,
    pub alert_lookups: usize,
    pub alert_checks: usize,
    pub alert_batches: usize,
    pub single_alerts: usize,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<CanonicalRecord>,
    alerts: Vec<BrandAlert>,
    faults: Faults,
    calls: Calls,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: Faults) -> Self {
        let store = Self::default();
        store.set_faults(faults);
        store
    }

    pub fn set_faults(&self, faults: Faults) {
        self.inner.lock().unwrap().faults = faults;
    }

    pub fn records(&self) -> Vec<CanonicalRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    pub fn alerts(&self) -> Vec<BrandAlert> {
        self.inner.lock().unwrap().alerts.clone()
    }

    pub fn calls(&self) -> Calls {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Seed a record without going through the pipeline
    pub fn seed_record(&self, record: CanonicalRecord) {
        self.inner.lock().unwrap().records.push(record);
    }

    pub fn seed_alert(&self, alert: BrandAlert) {
        self.inner.lock().unwrap().alerts.push(alert);
    }
}

fn alert_present(alerts: &[BrandAlert], key: &AlertKey) -> bool {
    alerts
        .iter()
        .any(|a| a.business_key == key.business_key && a.brand_name == key.brand_name)
}

#[async_trait]
impl ImportStore for MemoryStore {
    async fn delete_records_for_context(&self, context_code: &str) -> StoreResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.deletes += 1;
        if inner.faults.fail_delete {
            return Err(StoreError::Backend("delete rejected".to_string()));
        }
        let before = inner.records.len();
        inner
            .records
            .retain(|r| r.codigo_acuerdo_marco != context_code);
        Ok((before - inner.records.len()) as u64)
    }

    async fn insert_records(&self, records: &[CanonicalRecord]) -> StoreResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.record_batches += 1;
        if inner.faults.fail_record_batches > 0 {
            inner.faults.fail_record_batches -= 1;
            return Err(StoreError::Backend("batch rejected".to_string()));
        }
        if records
            .iter()
            .any(|r| inner.faults.failing_keys.contains(&r.orden_electronica))
        {
            return Err(StoreError::Backend("batch contains a bad record".to_string()));
        }
        inner.records.extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn insert_record(&self, record: &CanonicalRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.single_records += 1;
        if inner.faults.failing_keys.contains(&record.orden_electronica) {
            return Err(StoreError::Backend(format!(
                "record {} rejected",
                record.orden_electronica
            )));
        }
        inner.records.push(record.clone());
        Ok(())
    }

    async fn existing_alert_keys(&self, business_keys: &[String]) -> StoreResult<Vec<AlertKey>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.alert_lookups += 1;
        if inner.faults.fail_alert_lookup {
            return Err(StoreError::Backend("lookup rejected".to_string()));
        }
        Ok(inner
            .alerts
            .iter()
            .filter(|a| business_keys.contains(&a.business_key))
            .map(BrandAlert::key)
            .collect())
    }

    async fn alert_exists(&self, key: &AlertKey) -> StoreResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.alert_checks += 1;
        Ok(alert_present(&inner.alerts, key))
    }

    async fn insert_alerts(&self, alerts: &[BrandAlert]) -> StoreResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.alert_batches += 1;
        if inner.faults.fail_alert_batch {
            return Err(StoreError::Backend("alert batch rejected".to_string()));
        }
        // All-or-nothing, like a single multi-row INSERT under a unique index
        let mut keys = HashSet::new();
        for alert in alerts {
            let key = alert.key();
            if alert_present(&inner.alerts, &key) || !keys.insert(key) {
                return Err(StoreError::Conflict(format!(
                    "{} / {}",
                    alert.business_key, alert.brand_name
                )));
            }
        }
        inner.alerts.extend_from_slice(alerts);
        Ok(alerts.len() as u64)
    }

    async fn insert_alert(&self, alert: &BrandAlert) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.single_alerts += 1;
        if alert_present(&inner.alerts, &alert.key()) {
            return Err(StoreError::Conflict(format!(
                "{} / {}",
                alert.business_key, alert.brand_name
            )));
        }
        inner.alerts.push(alert.clone());
        Ok(())
    }

    async fn count_records_for_context(&self, context_code: &str) -> StoreResult<u64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .filter(|r| r.codigo_acuerdo_marco == context_code)
            .count() as u64)
    }
}
