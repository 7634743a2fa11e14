//! Row transformation and validation
//!
//! Turns one chunk of raw rows into canonical records:
//! 1. Skip rows whose cells are all blank
//! 2. Coerce every mapped field by its declared kind
//! 3. Drop rows excluded by the business filter (counted, not an error)
//! 4. Validate required fields and tax ids; a failing row yields one message
//! 5. Collect brand alert candidates for each valid record

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{FieldKind, ImportConfig};
use crate::models::{
    excel_serial_to_date, BrandAlert, CanonicalRecord, Cell, ColumnMapping, ContextTag,
    FieldValue, RawRow, RowAccessor,
};
use crate::services::brand_detector::BrandDetector;

static DMY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("valid regex"));
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid regex"));
static CURRENCY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i:S/\.?|US\$|\$)\s*").expect("valid regex"));
static NUMERIC_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d.,\-]").expect("valid regex"));
static NUMERIC_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(\d+(\.\d*)?|\.\d+)").expect("valid regex"));
static TAX_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{11}$").expect("valid regex"));

/// Coerce a cell to a date; never fails
///
/// Serial numbers use the 1900 spreadsheet system, `D/M/YYYY` and `D-M-YYYY`
/// text is reordered, ISO text is kept. Anything else, including impossible
/// calendar dates, becomes `sentinel`.
pub fn coerce_date(cell: &Cell, sentinel: NaiveDate) -> NaiveDate {
    match cell {
        Cell::Date(d) => *d,
        Cell::Number(n) => excel_serial_to_date(*n).unwrap_or(sentinel),
        Cell::Text(s) => parse_text_date(s.trim()).unwrap_or(sentinel),
        Cell::Empty | Cell::Bool(_) => sentinel,
    }
}

fn parse_text_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = DMY_DATE.captures(text) {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = ISO_DATE.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// Coerce a cell to a number; failures become 0
///
/// A leading currency symbol (`S/.`, `S/`, `US$`, `$`) is dropped, then the
/// text is stripped of everything but digits, `.`, `,` and `-`. When both
/// separators appear the commas are thousands separators (`1,234.50`);
/// otherwise the first comma is the decimal point (`12,5`). The longest
/// numeric prefix is parsed.
pub fn coerce_number(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Text(s) => parse_text_number(s),
        _ => 0.0,
    }
}

fn parse_text_number(text: &str) -> f64 {
    let amount = CURRENCY_PREFIX.replace(text.trim(), "");
    let cleaned = NUMERIC_NOISE.replace_all(&amount, "");
    let normalized = if cleaned.contains(',') && cleaned.contains('.') {
        cleaned.replace(',', "")
    } else {
        cleaned.replacen(',', ".", 1)
    };

    NUMERIC_PREFIX
        .find(&normalized)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Coerce a cell to trimmed text; blank and bare-dash cells become empty
pub fn coerce_text(cell: &Cell) -> String {
    if cell.is_blank() {
        String::new()
    } else {
        cell.as_text()
    }
}

/// Everything produced from one chunk
#[derive(Debug, Clone, Default)]
pub struct ChunkOutcome {
    pub records: Vec<CanonicalRecord>,
    pub alerts: Vec<BrandAlert>,
    /// Recorded row errors, at most the configured ceiling
    pub errors: Vec<String>,
    /// Rows dropped by the business filter
    pub filtered: usize,
    /// Rows rejected by validation, including ones whose message was not
    /// recorded because the ceiling was reached
    pub invalid: usize,
    /// Entirely blank rows skipped
    pub blank: usize,
}

/// Per-job row transformer
pub struct RowTransformer<'a> {
    config: &'a ImportConfig,
    mapping: &'a ColumnMapping,
    context: &'a ContextTag,
    detector: &'a BrandDetector,
}

enum RowResult {
    Blank,
    Filtered,
    Invalid(String),
    Valid(CanonicalRecord, Vec<BrandAlert>),
}

impl<'a> RowTransformer<'a> {
    pub fn new(
        config: &'a ImportConfig,
        mapping: &'a ColumnMapping,
        context: &'a ContextTag,
        detector: &'a BrandDetector,
    ) -> Self {
        Self {
            config,
            mapping,
            context,
            detector,
        }
    }

    /// Transform one chunk
    ///
    /// Once `error_ceiling` messages are recorded, later failing rows are
    /// still rejected and counted as invalid but add no message.
    pub fn transform_chunk(&self, rows: &[RawRow]) -> ChunkOutcome {
        let mut outcome = ChunkOutcome::default();

        for row in rows {
            match self.transform_row(row) {
                RowResult::Blank => outcome.blank += 1,
                RowResult::Filtered => outcome.filtered += 1,
                RowResult::Invalid(message) => {
                    outcome.invalid += 1;
                    if outcome.errors.len() < self.config.error_ceiling {
                        outcome.errors.push(message);
                    }
                }
                RowResult::Valid(record, alerts) => {
                    outcome.records.push(record);
                    outcome.alerts.extend(alerts);
                }
            }
        }

        if outcome.invalid > outcome.errors.len() {
            tracing::debug!(
                invalid = outcome.invalid,
                recorded = outcome.errors.len(),
                "Row error ceiling reached, remaining messages not recorded"
            );
        }

        outcome
    }

    fn transform_row(&self, row: &RawRow) -> RowResult {
        if row.is_blank() {
            return RowResult::Blank;
        }

        let accessor = RowAccessor::new(row, self.mapping);
        let mut record = CanonicalRecord::new(self.context, self.config.sentinel_date);

        for column in &self.config.columns {
            if self.mapping.index_of(&column.field).is_none() {
                continue;
            }
            let cell = accessor.get(&column.field);
            let value = match column.kind {
                FieldKind::Text => FieldValue::Text(coerce_text(cell)),
                FieldKind::Date => FieldValue::Date(coerce_date(cell, self.config.sentinel_date)),
                FieldKind::Number => FieldValue::Number(coerce_number(cell)),
            };
            record.set(&column.field, value);
        }

        let business_key = coerce_text(accessor.get(&self.config.business_key_field));
        if !self.config.exclusion_suffix.is_empty()
            && business_key.ends_with(&self.config.exclusion_suffix)
        {
            return RowResult::Filtered;
        }

        let violations = self.validate(&accessor);
        if !violations.is_empty() {
            return RowResult::Invalid(format!(
                "Row {}: {}",
                accessor.row_number(),
                violations.join("; ")
            ));
        }

        let brand_text = coerce_text(accessor.get(&self.config.brand_field));
        let alerts = if brand_text.is_empty() {
            Vec::new()
        } else {
            self.detector
                .candidates(&business_key, &self.context.label, &brand_text, Utc::now())
        };

        RowResult::Valid(record, alerts)
    }

    fn validate(&self, accessor: &RowAccessor<'_>) -> Vec<String> {
        let mut violations = Vec::new();

        for field in &self.config.required_fields {
            if accessor.get(field).is_blank() {
                violations.push(format!("required field '{}' is empty", field));
            }
        }

        for field in &self.config.tax_id_fields {
            let value = coerce_text(accessor.get(field));
            if !value.is_empty() && !TAX_ID.is_match(&value) {
                violations.push(format!("invalid {} '{}' (expected 11 digits)", field, value));
            }
        }

        violations
    }
}
