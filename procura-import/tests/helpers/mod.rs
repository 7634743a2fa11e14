//! Shared fixtures for procura-import integration tests

#![allow(dead_code)]

pub mod memory_store;
pub mod sheet;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use procura_common::events::{ImportEvent, ImportStats};
use procura_import::config::ImportConfig;
use procura_import::models::{ContextTag, ImportJob};
use procura_import::services::{ImportOrchestrator, WorkbookSource};
use procura_import::ImportError;
use tokio::sync::mpsc;

pub use memory_store::{Calls, Faults, MemoryStore};
pub use sheet::{numbered, sheet, sheet_with_header, text, OrderRow, HEADER};

pub const CONTEXT_LABEL: &str = "EXT-CE-2022-5 Material medico";
pub const CONTEXT_CODE: &str = "EXT-CE-2022-5";

/// Source returning fixed bytes or a fixed fetch failure
pub struct StaticSource {
    result: Result<Vec<u8>, String>,
}

impl StaticSource {
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Self { result: Ok(bytes) }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl WorkbookSource for StaticSource {
    async fn fetch(&self, _reference: &str) -> Result<Vec<u8>, ImportError> {
        self.result.clone().map_err(ImportError::Fetch)
    }
}

/// Default config without the pause between chunks
pub fn test_config() -> ImportConfig {
    ImportConfig {
        inter_chunk_pause: Duration::ZERO,
        ..ImportConfig::default()
    }
}

pub fn context() -> ContextTag {
    ContextTag::from_label(CONTEXT_LABEL).unwrap()
}

pub fn job(file_size: u64) -> ImportJob {
    ImportJob::new("file:///tmp/ordenes.xlsx", "ordenes.xlsx", file_size, context())
}

pub fn orchestrator(store: Arc<MemoryStore>, config: ImportConfig) -> ImportOrchestrator {
    ImportOrchestrator::new(
        store,
        Arc::new(StaticSource::failing("no source in this test")),
        Arc::new(config),
    )
}

/// Collect everything already sent on the channel
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ImportEvent>) -> Vec<ImportEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Progress fractions in emission order
pub fn progress_values(events: &[ImportEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            ImportEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

/// The `complete` event's fields; panics on any other terminal event
pub fn completion(events: &[ImportEvent]) -> (bool, String, ImportStats) {
    match events.last() {
        Some(ImportEvent::Complete {
            success,
            message,
            stats,
        }) => (*success, message.clone(), stats.clone()),
        other => panic!("expected complete event, got {:?}", other),
    }
}

/// The `error` event's message; panics on any other terminal event
pub fn failure(events: &[ImportEvent]) -> String {
    match events.last() {
        Some(ImportEvent::Error { message }) => message.clone(),
        other => panic!("expected error event, got {:?}", other),
    }
}

pub fn terminal_count(events: &[ImportEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}
