//! Data models for procura-import
//!
//! - cell: raw sheet cells, column mapping, row access by field name
//! - record: canonical records, context tags, brand alerts
//! - import_job: per-job state machine

pub mod cell;
pub mod import_job;
pub mod record;

pub use cell::{excel_serial_to_date, Cell, ColumnMapping, RawRow, RowAccessor};
pub use import_job::{ImportJob, ImportState, StateTransition};
pub use record::{
    fields, AlertKey, AlertStatus, BrandAlert, CanonicalRecord, ContextTag, FieldValue,
};
