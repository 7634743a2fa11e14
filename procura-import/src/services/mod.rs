//! Import pipeline components
//!
//! Leaves first: header resolution, deduplication, chunk planning, row
//! transformation, brand detection, persistence. The orchestrator wires them
//! together for one job.

pub mod batch_persister;
pub mod brand_detector;
pub mod chunk_planner;
pub mod header_resolver;
pub mod import_orchestrator;
pub mod row_deduplicator;
pub mod row_transformer;
pub mod workbook_reader;
pub mod workbook_source;

pub use batch_persister::{BatchPersister, PersistOutcome};
pub use brand_detector::BrandDetector;
pub use chunk_planner::{ChunkPlan, ProcessingMethod};
pub use header_resolver::{normalize_header, resolve_headers, HeaderResolution};
pub use import_orchestrator::ImportOrchestrator;
pub use row_deduplicator::{deduplicate, DedupOutcome};
pub use row_transformer::{coerce_date, coerce_number, coerce_text, ChunkOutcome, RowTransformer};
pub use workbook_reader::read_first_sheet;
pub use workbook_source::{HttpWorkbookSource, WorkbookSource};
