//! Row deduplication by business key
//!
//! Exports repeat an order once per delivery line when the same line is
//! re-published; only the first occurrence is kept. Rows whose key cell is
//! blank are dropped here too and counted with the duplicates.

use std::collections::HashSet;

use crate::models::RawRow;

/// Deduplicated rows plus the number dropped
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub rows: Vec<RawRow>,
    /// Rows dropped for a repeated or blank business key
    pub duplicates: usize,
}

/// Keep each row whose business key is non-empty and not seen before
///
/// Order is preserved. The key is the cell at `key_index` rendered as
/// trimmed text, so `12345` stored as a number and `"12345"` stored as text
/// collide.
pub fn deduplicate(rows: Vec<RawRow>, key_index: usize) -> DedupOutcome {
    let total = rows.len();
    let mut seen = HashSet::with_capacity(total);

    let kept: Vec<RawRow> = rows
        .into_iter()
        .filter(|row| {
            let key = row.cell(key_index).as_text();
            !key.is_empty() && seen.insert(key)
        })
        .collect();

    DedupOutcome {
        duplicates: total - kept.len(),
        rows: kept,
    }
}
