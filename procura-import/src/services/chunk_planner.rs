//! Chunk planning
//!
//! Large exports are processed in bounded, contiguous slices so that a bad
//! batch or a slow store only ever holds one slice's worth of records in
//! flight.

use serde::{Deserialize, Serialize};

use crate::models::RawRow;

/// How the rows were split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMethod {
    Chunked,
    Single,
}

impl ProcessingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMethod::Chunked => "chunked",
            ProcessingMethod::Single => "single",
        }
    }
}

/// Ordered slices of the deduplicated rows
#[derive(Debug, Clone)]
pub struct ChunkPlan<'a> {
    pub chunks: Vec<&'a [RawRow]>,
    pub method: ProcessingMethod,
}

impl ChunkPlan<'_> {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Split `rows` into chunks of at most `max_rows` rows
///
/// Chunking applies when there are more than `max_rows` rows or the file is
/// larger than `size_threshold` bytes; otherwise all rows form one chunk.
/// An empty input yields no chunks.
pub fn plan(rows: &[RawRow], file_size: u64, max_rows: usize, size_threshold: u64) -> ChunkPlan<'_> {
    let max_rows = max_rows.max(1);
    let chunked = rows.len() > max_rows || file_size > size_threshold;

    let method = if chunked {
        ProcessingMethod::Chunked
    } else {
        ProcessingMethod::Single
    };

    let chunks = if rows.is_empty() {
        Vec::new()
    } else if chunked {
        rows.chunks(max_rows).collect()
    } else {
        vec![rows]
    };

    ChunkPlan { chunks, method }
}
