//! Raw sheet cells and column-mapped row access

use chrono::{Days, NaiveDate};
use std::collections::HashMap;

/// Untyped value of one sheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    /// Render the cell as trimmed text
    ///
    /// Integral numbers render without a fractional part so tax ids stored as
    /// numbers keep their digits (`20123456789`, not `20123456789.0`).
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Empty cells and cells holding only whitespace or a bare dash
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => {
                let trimmed = s.trim();
                trimmed.is_empty() || trimmed == "-"
            }
            _ => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

/// One sheet row
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based row number in the sheet
    pub number: usize,
    pub cells: Vec<Cell>,
}

impl RawRow {
    pub fn new(number: usize, cells: Vec<Cell>) -> Self {
        Self { number, cells }
    }

    /// Cell at `index`, or [`Cell::Empty`] past the end of a short row
    pub fn cell(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&EMPTY)
    }

    /// Every cell blank
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }
}

static EMPTY: Cell = Cell::Empty;

/// Convert a 1900-system spreadsheet serial to a calendar date
///
/// Serial 1 is 1900-01-01. The 1900 system counts a non-existent 1900-02-29
/// (serial 60), so serials from 61 on are offset by one day. The time of day
/// (fractional part) is discarded. Returns `None` for serials below 1,
/// non-finite values and dates past year 9999.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }

    let days = serial.floor() as u64;
    let epoch = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_days(Days::new(days))
}

/// Canonical field name → column index, built once per job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    indexes: HashMap<String, usize>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, index: usize) {
        self.indexes.insert(field.into(), index);
    }

    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.indexes.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

/// Field-name access to a row through a [`ColumnMapping`]
#[derive(Debug, Clone, Copy)]
pub struct RowAccessor<'a> {
    row: &'a RawRow,
    mapping: &'a ColumnMapping,
}

impl<'a> RowAccessor<'a> {
    pub fn new(row: &'a RawRow, mapping: &'a ColumnMapping) -> Self {
        Self { row, mapping }
    }

    /// Cell for `field`; unmapped fields read as empty
    pub fn get(&self, field: &str) -> &'a Cell {
        match self.mapping.index_of(field) {
            Some(index) => self.row.cell(index),
            None => &EMPTY,
        }
    }

    pub fn row_number(&self) -> usize {
        self.row.number
    }
}
