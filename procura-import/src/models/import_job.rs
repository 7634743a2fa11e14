//! Import job state machine
//!
//! Started → HeaderResolved → Deduplicated → ExistingDataCleared →
//! ChunkProcessing(i, n)* → Completed | Failed
//!
//! Jobs are not persisted; their durable effects are the stored records and
//! alerts plus the terminal event sent to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContextTag;

/// Import job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportState {
    /// Workbook fetched and parsed
    Started,
    /// Column mapping built, required fields present
    HeaderResolved,
    /// Repeated business keys dropped
    Deduplicated,
    /// Previous records for the context deleted; nothing before this point
    /// touched storage
    ExistingDataCleared,
    /// Working on chunk `index` (0-based) of `total`
    ChunkProcessing { index: usize, total: usize },
    Completed,
    Failed,
}

impl ImportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportState::Completed | ImportState::Failed)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub job_id: Uuid,
    pub old_state: ImportState,
    pub new_state: ImportState,
    pub transitioned_at: DateTime<Utc>,
}

/// One import request and its progress through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub job_id: Uuid,

    /// Where the workbook bytes come from (URL or path)
    pub file_reference: String,

    pub file_name: String,

    /// Declared size in bytes; feeds the chunking decision
    pub file_size: u64,

    pub context: ContextTag,

    pub state: ImportState,

    pub started_at: DateTime<Utc>,

    pub ended_at: Option<DateTime<Utc>>,

    /// Reason for `Failed`
    pub failure: Option<String>,
}

impl ImportJob {
    pub fn new(
        file_reference: impl Into<String>,
        file_name: impl Into<String>,
        file_size: u64,
        context: ContextTag,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            file_reference: file_reference.into(),
            file_name: file_name.into(),
            file_size,
            context,
            state: ImportState::Started,
            started_at: Utc::now(),
            ended_at: None,
            failure: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: ImportState) -> StateTransition {
        let transition = StateTransition {
            job_id: self.job_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(transition.transitioned_at);
        }

        tracing::debug!(
            job_id = %self.job_id,
            old_state = ?transition.old_state,
            new_state = ?transition.new_state,
            "Import job state transition"
        );

        transition
    }

    /// Transition to `Failed`, recording the reason
    pub fn fail(&mut self, reason: impl Into<String>) -> StateTransition {
        self.failure = Some(reason.into());
        self.transition_to(ImportState::Failed)
    }
}
