//! Import trigger
//!
//! POST /import/process starts a job and answers with its event stream.
//! POST /import/reset deletes everything stored under a context code.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use procura_common::events::ProgressEmitter;
use procura_common::sse::import_event_sse;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::{ContextTag, ImportJob, ImportState};
use crate::AppState;

/// Context codes with a job in flight
///
/// Two concurrent jobs for the same code would interleave their
/// delete-then-insert sequences, so the second one is rejected.
#[derive(Debug, Clone, Default)]
pub struct ActiveContexts {
    codes: Arc<Mutex<HashSet<String>>>,
}

impl ActiveContexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `code`; `None` when a job for it is already running
    pub fn try_acquire(&self, code: &str) -> Option<ContextGuard> {
        let mut codes = self.codes.lock().unwrap_or_else(|e| e.into_inner());
        if !codes.insert(code.to_string()) {
            return None;
        }
        Some(ContextGuard {
            codes: Arc::clone(&self.codes),
            code: code.to_string(),
        })
    }

    pub fn is_active(&self, code: &str) -> bool {
        self.codes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its context code when dropped
#[derive(Debug)]
pub struct ContextGuard {
    codes: Arc<Mutex<HashSet<String>>>,
    code: String,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.codes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.code);
    }
}

/// POST /import/process request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImportRequest {
    pub file_reference: Option<String>,
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: u64,
    pub context_label: Option<String>,
}

/// POST /import/reset request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetContextRequest {
    pub context_code: Option<String>,
}

/// POST /import/reset response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetContextResponse {
    pub success: bool,
    pub context_code: String,
    pub deleted: u64,
}

fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", name)))
}

/// Last path segment of a reference, without any query string
fn file_name_from_reference(reference: &str) -> String {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    path.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
        .to_string()
}

/// POST /import/process
///
/// Validates the trigger, then runs the job in the background and streams
/// its events as SSE. The job keeps running if the client disconnects.
pub async fn process_import(
    State(state): State<AppState>,
    Json(request): Json<ProcessImportRequest>,
) -> ApiResult<impl IntoResponse> {
    let file_reference = required(request.file_reference, "fileReference")?;
    let context_label = required(request.context_label, "contextLabel")?;

    let max_size = state.config.max_file_size_bytes;
    if request.file_size > max_size {
        return Err(ApiError::BadRequest(format!(
            "File too large: {} bytes (maximum {} bytes)",
            request.file_size, max_size
        )));
    }

    let context = ContextTag::from_label(&context_label)
        .ok_or_else(|| ApiError::BadRequest("contextLabel is required".to_string()))?;

    let guard = state.active_contexts.try_acquire(&context.code).ok_or_else(|| {
        ApiError::Conflict(format!(
            "An import for agreement {} is already running",
            context.code
        ))
    })?;

    let file_name = request
        .file_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| file_name_from_reference(&file_reference));

    let job = ImportJob::new(file_reference, file_name, request.file_size, context);
    let job_id = job.job_id;
    let (mut emitter, rx) = ProgressEmitter::channel();

    let orchestrator = Arc::clone(&state.orchestrator);
    let last_error = Arc::clone(&state.last_error);
    tokio::spawn(async move {
        let _guard = guard;
        let job = orchestrator.run(job, &mut emitter).await;

        if job.state == ImportState::Failed {
            *last_error.write().await = job.failure.clone();
        }
        tracing::info!(
            job_id = %job_id,
            state = ?job.state,
            "Background import task finished"
        );
    });

    Ok(import_event_sse(rx))
}

/// POST /import/reset
pub async fn reset_context(
    State(state): State<AppState>,
    Json(request): Json<ResetContextRequest>,
) -> ApiResult<Json<ResetContextResponse>> {
    let context_code = required(request.context_code, "contextCode")?;

    let _guard = state.active_contexts.try_acquire(&context_code).ok_or_else(|| {
        ApiError::Conflict(format!(
            "An import for agreement {} is running",
            context_code
        ))
    })?;

    let deleted = state.store.delete_records_for_context(&context_code).await?;
    tracing::info!(context = %context_code, deleted, "Context reset");

    Ok(Json(ResetContextResponse {
        success: true,
        context_code,
        deleted,
    }))
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/process", post(process_import))
        .route("/import/reset", post(reset_context))
}
