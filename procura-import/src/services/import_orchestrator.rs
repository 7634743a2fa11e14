//! Import pipeline orchestration
//!
//! Drives one job through fetch → parse → header resolution → dedup →
//! replace-by-context → per chunk (transform, detect, persist), reporting
//! progress through a [`ProgressEmitter`].
//!
//! Nothing touches storage before the header is resolved and the rows are
//! deduplicated, so every setup failure leaves the store unchanged. Once the
//! previous data is cleared the job always runs to the `complete` event; a
//! failing chunk only adds error messages.

use std::sync::Arc;

use procura_common::events::{ImportStats, ProgressEmitter};
use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::db::ImportStore;
use crate::error::ImportError;
use crate::models::{ImportJob, ImportState, RawRow};
use crate::services::batch_persister::BatchPersister;
use crate::services::brand_detector::BrandDetector;
use crate::services::chunk_planner;
use crate::services::header_resolver::resolve_headers;
use crate::services::row_deduplicator::deduplicate;
use crate::services::row_transformer::RowTransformer;
use crate::services::workbook_reader::read_first_sheet;
use crate::services::workbook_source::WorkbookSource;

/// Progress after parsing
const PROGRESS_PARSED: f64 = 0.1;
const PROGRESS_HEADERS: f64 = 0.2;
const PROGRESS_DEDUP: f64 = 0.25;
const PROGRESS_CLEARED: f64 = 0.3;
/// Share of the bar covered by chunk processing
const PROGRESS_CHUNK_SPAN: f64 = 0.6;

/// Runs import jobs against a store
pub struct ImportOrchestrator {
    store: Arc<dyn ImportStore>,
    source: Arc<dyn WorkbookSource>,
    config: Arc<ImportConfig>,
    detector: BrandDetector,
}

impl ImportOrchestrator {
    pub fn new(
        store: Arc<dyn ImportStore>,
        source: Arc<dyn WorkbookSource>,
        config: Arc<ImportConfig>,
    ) -> Self {
        let detector = BrandDetector::new(&config.brands);
        Self {
            store,
            source,
            config,
            detector,
        }
    }

    /// Fetch, parse and import the job's workbook
    ///
    /// Always ends with exactly one terminal event on `emitter`. Returns the
    /// job in its terminal state.
    pub async fn run(&self, mut job: ImportJob, emitter: &mut ProgressEmitter) -> ImportJob {
        info!(
            job_id = %job.job_id,
            file_name = %job.file_name,
            file_size = job.file_size,
            context = %job.context.code,
            "Import job started"
        );

        match self.load_rows(&job).await {
            Ok(rows) => self.import_rows(job, rows, emitter).await,
            Err(e) => {
                self.abort(&mut job, &e, emitter);
                job
            }
        }
    }

    /// Import already-parsed sheet rows (header included)
    pub async fn import_rows(
        &self,
        mut job: ImportJob,
        rows: Vec<RawRow>,
        emitter: &mut ProgressEmitter,
    ) -> ImportJob {
        match self.process(&mut job, rows, emitter).await {
            Ok(stats) => {
                let success = stats.inserted_rows > 0;
                let message = summary_message(&stats, &job.context.code);
                job.transition_to(ImportState::Completed);

                info!(
                    job_id = %job.job_id,
                    context = %job.context.code,
                    inserted = stats.inserted_rows,
                    alerts = stats.processed_brand_alerts,
                    invalid = stats.invalid_rows,
                    filtered = stats.filtered_rows,
                    chunks = stats.chunks_processed,
                    "Import job completed"
                );
                emitter.complete(success, message, stats);
            }
            Err(e) => self.abort(&mut job, &e, emitter),
        }
        job
    }

    async fn load_rows(&self, job: &ImportJob) -> Result<Vec<RawRow>, ImportError> {
        let bytes = self.source.fetch(&job.file_reference).await?;

        tokio::task::spawn_blocking(move || read_first_sheet(&bytes))
            .await
            .map_err(|e| ImportError::InvalidWorkbook(format!("Workbook parser task failed: {}", e)))?
    }

    fn abort(&self, job: &mut ImportJob, error: &ImportError, emitter: &mut ProgressEmitter) {
        let message = error.to_string();
        warn!(
            job_id = %job.job_id,
            context = %job.context.code,
            error = %message,
            "Import job failed during setup"
        );
        job.fail(message.clone());
        emitter.fail(message);
    }

    async fn process(
        &self,
        job: &mut ImportJob,
        mut rows: Vec<RawRow>,
        emitter: &mut ProgressEmitter,
    ) -> Result<ImportStats, ImportError> {
        let config = &*self.config;

        if rows.len() < config.min_rows {
            return Err(ImportError::InvalidWorkbook(format!(
                "expected at least {} rows (header at row {}), found {}",
                config.min_rows,
                config.header_row_index + 1,
                rows.len()
            )));
        }
        emitter.progress(
            PROGRESS_PARSED,
            format!("Read {} rows from {}", rows.len(), job.file_name),
        );

        // Header
        let data_rows = rows.split_off(config.header_row_index + 1);
        let header = &rows[config.header_row_index];
        let resolution = resolve_headers(&header.cells, &config.columns, &config.required_fields)?;
        let key_index = resolution
            .mapping
            .index_of(&config.business_key_field)
            .ok_or_else(|| ImportError::MissingColumns(vec![config.business_key_field.clone()]))?;

        if !resolution.unresolved.is_empty() {
            info!(
                job_id = %job.job_id,
                unresolved = ?resolution.unresolved,
                "Optional columns not found, reading them as empty"
            );
        }
        job.transition_to(ImportState::HeaderResolved);
        emitter.progress(
            PROGRESS_HEADERS,
            format!("Resolved {} columns", resolution.mapping.len()),
        );

        // Dedup
        let total_rows = data_rows.len();
        let dedup = deduplicate(data_rows, key_index);
        job.transition_to(ImportState::Deduplicated);
        if dedup.duplicates > 0 {
            emitter.progress(
                PROGRESS_DEDUP,
                format!("Removed {} duplicate rows", dedup.duplicates),
            );
        }

        // Replace by context
        let persister = BatchPersister::new(
            Arc::clone(&self.store),
            config.record_batch_size,
            config.alert_batch_size,
        );
        let deleted = persister
            .clear_context(&job.context.code)
            .await
            .map_err(|source| ImportError::ClearExisting {
                context: job.context.code.clone(),
                source,
            })?;
        job.transition_to(ImportState::ExistingDataCleared);
        emitter.progress(
            PROGRESS_CLEARED,
            format!(
                "Removed {} existing records for agreement {}",
                deleted, job.context.code
            ),
        );

        // Chunks
        let plan = chunk_planner::plan(
            &dedup.rows,
            job.file_size,
            config.max_rows_per_chunk,
            config.chunking_file_size_threshold,
        );
        let context = job.context.clone();
        let transformer =
            RowTransformer::new(config, &resolution.mapping, &context, &self.detector);

        let mut stats = ImportStats {
            total_rows,
            unique_rows: dedup.rows.len(),
            duplicate_rows: dedup.duplicates,
            processing_method: plan.method.as_str().to_string(),
            file_size: job.file_size,
            file_name: job.file_name.clone(),
            acuerdo_marco: job.context.code.clone(),
            ..Default::default()
        };
        let mut errors: Vec<String> = Vec::new();
        let mut failed_records: Vec<String> = Vec::new();
        let total = plan.len();

        for (index, chunk) in plan.chunks.iter().enumerate() {
            job.transition_to(ImportState::ChunkProcessing { index, total });
            emitter.progress(
                PROGRESS_CLEARED + (index as f64 / total as f64) * PROGRESS_CHUNK_SPAN,
                format!(
                    "Processing chunk {} of {} ({} rows)",
                    index + 1,
                    total,
                    chunk.len()
                ),
            );

            let outcome = transformer.transform_chunk(chunk);
            let persisted = persister
                .persist_chunk(&outcome.records, &outcome.alerts)
                .await;

            info!(
                job_id = %job.job_id,
                chunk = index + 1,
                total,
                valid = outcome.records.len(),
                inserted = persisted.inserted_records,
                alerts = persisted.inserted_alerts,
                invalid = outcome.invalid,
                filtered = outcome.filtered,
                "Chunk processed"
            );

            stats.processed_rows += outcome.records.len();
            stats.filtered_rows += outcome.filtered;
            stats.invalid_rows += outcome.invalid;
            stats.inserted_rows += persisted.inserted_records;
            stats.processed_brand_alerts += persisted.inserted_alerts;
            stats.chunks_processed += 1;
            errors.extend(outcome.errors);
            errors.extend(persisted.errors);
            failed_records.extend(persisted.failed_record_keys);

            if index + 1 < total && !config.inter_chunk_pause.is_zero() {
                tokio::time::sleep(config.inter_chunk_pause).await;
            }
        }

        errors.truncate(config.summary_error_limit);
        failed_records.truncate(config.failed_record_limit);
        stats.errors = errors;
        stats.failed_records = failed_records;

        Ok(stats)
    }
}

fn summary_message(stats: &ImportStats, context_code: &str) -> String {
    let outcome = if stats.errors.is_empty() && stats.failed_records.is_empty() {
        "File processed successfully"
    } else {
        "File processed with some errors"
    };
    format!(
        "{}. Inserted {} records and {} brand alerts in {} chunk(s) for agreement {}.",
        outcome,
        stats.inserted_rows,
        stats.processed_brand_alerts,
        stats.chunks_processed,
        context_code
    )
}
