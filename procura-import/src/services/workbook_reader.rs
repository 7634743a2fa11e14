//! Workbook parsing
//!
//! Reads the first sheet of an `.xlsx` workbook into [`RawRow`]s. calamine
//! returns only the used range, so leading empty rows and columns are padded
//! back in to keep sheet coordinates (the header is expected at a fixed row
//! index).

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;

use crate::error::ImportError;
use crate::models::{Cell, RawRow};

/// Parse the first worksheet of an xlsx workbook
///
/// CPU-bound; call from `spawn_blocking` in async contexts.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<RawRow>, ImportError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| ImportError::InvalidWorkbook(format!("Failed to open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::InvalidWorkbook("Workbook has no worksheets".to_string()))?
        .map_err(|e| ImportError::InvalidWorkbook(format!("Failed to read first sheet: {}", e)))?;

    let Some((start_row, start_col)) = range.start() else {
        return Ok(Vec::new());
    };
    let start_row = start_row as usize;
    let start_col = start_col as usize;

    let mut rows: Vec<RawRow> = (0..start_row)
        .map(|index| RawRow::new(index + 1, Vec::new()))
        .collect();

    for (offset, data_row) in range.rows().enumerate() {
        let mut cells = vec![Cell::Empty; start_col];
        cells.extend(data_row.iter().map(to_cell));
        rows.push(RawRow::new(start_row + offset + 1, cells));
    }

    tracing::debug!(rows = rows.len(), "Parsed first worksheet");
    Ok(rows)
}

/// Convert a calamine cell
pub fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        // as_datetime honors the workbook's 1904 date system
        Data::DateTime(dt) if dt.is_duration() => Cell::Number(dt.as_f64()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|moment| Cell::Date(moment.date()))
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}
