//! Header resolution
//!
//! Maps the raw header row of an export to canonical field names. Exports
//! from different years label the same column differently ("Orden
//! Electrónica", "ORDEN ELECTRONICA", "orden_electronica"), so each field
//! carries a list of aliases and matching falls back to a normalized form
//! that ignores case, accents, punctuation and spacing.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::ColumnSpec;
use crate::error::ImportError;
use crate::models::{Cell, ColumnMapping};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Result of resolving a header row
#[derive(Debug, Clone)]
pub struct HeaderResolution {
    pub mapping: ColumnMapping,
    /// Optional fields with no matching column (read as empty)
    pub unresolved: Vec<String>,
}

/// Normalize header text for loose comparison
///
/// Lowercase, strip accents (NFD, drop combining marks), drop anything that
/// is not alphanumeric, underscore or whitespace, collapse whitespace, trim.
pub fn normalize_header(raw: &str) -> String {
    let folded: String = raw
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let stripped = NON_WORD.replace_all(&folded, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Resolve `headers` against the column table
///
/// Per field, aliases are tried in order against the trimmed header text
/// first; only when no alias matches exactly is the normalized form tried,
/// again alias by alias. The first matching header cell wins. Fails with
/// [`ImportError::MissingColumns`] naming every required field left
/// unresolved.
pub fn resolve_headers(
    headers: &[Cell],
    columns: &[ColumnSpec],
    required: &[String],
) -> Result<HeaderResolution, ImportError> {
    let raw: Vec<String> = headers.iter().map(Cell::as_text).collect();
    let normalized: Vec<String> = raw.iter().map(|h| normalize_header(h)).collect();

    let mut mapping = ColumnMapping::new();
    let mut unresolved = Vec::new();

    for column in columns {
        match find_column(column, &raw, &normalized) {
            Some(index) => {
                tracing::debug!(
                    field = %column.field,
                    index,
                    header = %raw[index],
                    "Resolved column"
                );
                mapping.insert(column.field.clone(), index);
            }
            None => unresolved.push(column.field.clone()),
        }
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|field| mapping.index_of(field).is_none())
        .cloned()
        .collect();

    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    unresolved.retain(|field| !required.contains(field));

    Ok(HeaderResolution {
        mapping,
        unresolved,
    })
}

fn find_column(column: &ColumnSpec, raw: &[String], normalized: &[String]) -> Option<usize> {
    let exact = column
        .aliases
        .iter()
        .find_map(|alias| raw.iter().position(|h| !h.is_empty() && h == alias.trim()));

    exact.or_else(|| {
        column.aliases.iter().find_map(|alias| {
            let target = normalize_header(alias);
            if target.is_empty() {
                return None;
            }
            normalized.iter().position(|h| *h == target)
        })
    })
}
