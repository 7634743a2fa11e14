//! Import progress events
//!
//! A running import writes [`ImportEvent`]s into a [`ProgressEmitter`]; the
//! transport layer owns the receiving half and decides how to deliver them
//! (SSE for the HTTP API, a plain `Vec` in tests).
//!
//! Wire format (one JSON object per event):
//!
//! ```json
//! {"type":"progress","progress":0.3,"message":"..."}
//! {"type":"complete","success":true,"message":"...","stats":{...}}
//! {"type":"error","message":"..."}
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Event emitted by an import job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImportEvent {
    /// Milestone reached; `progress` is a completion fraction in `0.0..=1.0`
    Progress { progress: f64, message: String },

    /// Job reached the end of the pipeline
    ///
    /// `success` means at least one record was persisted, not zero errors.
    Complete {
        success: bool,
        message: String,
        stats: ImportStats,
    },

    /// Job aborted during setup; nothing was persisted
    Error { message: String },
}

impl ImportEvent {
    /// Terminal events end the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportEvent::Complete { .. } | ImportEvent::Error { .. })
    }

    /// Event type name as it appears in the `type` field
    pub fn event_type(&self) -> &'static str {
        match self {
            ImportEvent::Progress { .. } => "progress",
            ImportEvent::Complete { .. } => "complete",
            ImportEvent::Error { .. } => "error",
        }
    }
}

/// Aggregate statistics reported with the `complete` event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    /// Data rows below the header, before deduplication
    pub total_rows: usize,
    /// Rows left after deduplication
    pub unique_rows: usize,
    /// Rows dropped by deduplication (repeated or empty business key)
    pub duplicate_rows: usize,
    /// Rows that passed validation
    pub processed_rows: usize,
    /// Rows excluded by the business filter
    pub filtered_rows: usize,
    /// Rows rejected by validation
    pub invalid_rows: usize,
    /// Records persisted
    pub inserted_rows: usize,
    /// Brand alerts persisted
    pub processed_brand_alerts: usize,
    pub chunks_processed: usize,
    /// `chunked` or `single`
    pub processing_method: String,
    pub file_size: u64,
    pub file_name: String,
    /// Context code the records were stored under
    pub acuerdo_marco: String,
    /// Business keys of records that failed individual insertion (capped)
    pub failed_records: Vec<String>,
    /// First error messages (capped)
    pub errors: Vec<String>,
}

/// Producer half of an import event stream
///
/// Sending is best-effort: a dropped receiver (caller disconnected) never
/// fails the job. Once a terminal event has been sent every further event is
/// discarded.
#[derive(Debug)]
pub struct ProgressEmitter {
    tx: mpsc::UnboundedSender<ImportEvent>,
    terminated: bool,
}

impl ProgressEmitter {
    /// Create an emitter together with its receiving half
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ImportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                terminated: false,
            },
            rx,
        )
    }

    /// Emit a `progress` event; the fraction is clamped to `0.0..=1.0`
    pub fn progress(&mut self, fraction: f64, message: impl Into<String>) {
        let progress = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.send(ImportEvent::Progress {
            progress,
            message: message.into(),
        });
    }

    /// Emit the terminal `complete` event
    pub fn complete(&mut self, success: bool, message: impl Into<String>, stats: ImportStats) {
        self.send(ImportEvent::Complete {
            success,
            message: message.into(),
            stats,
        });
    }

    /// Emit the terminal `error` event
    pub fn fail(&mut self, message: impl Into<String>) {
        self.send(ImportEvent::Error {
            message: message.into(),
        });
    }

    /// Whether a terminal event has already been sent
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn send(&mut self, event: ImportEvent) {
        if self.terminated {
            warn!(
                event_type = event.event_type(),
                "Dropping import event emitted after terminal event"
            );
            return;
        }
        self.terminated = event.is_terminal();

        if self.tx.send(event).is_err() {
            debug!("Import event receiver gone, continuing without progress reporting");
        }
    }
}
