//! CSV persistence for ranked segments.
//!
//! Files have a `page,priority,content` header and one row per segment.
//! `content` is always double-quoted; literal `"` characters are removed
//! rather than escaped, so a write-then-read round trip is lossy for text
//! that contained quotes.

use crate::error::PreprocessError;
use crate::output::ScoredSegment;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const HEADER: &str = "page,priority,content";
pub const CONTENT_COLUMN: &str = "content";

/// One row of a segment CSV, as read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub page: usize,
    pub priority: f64,
    pub content: String,
}

impl From<&ScoredSegment> for CsvRow {
    fn from(s: &ScoredSegment) -> Self {
        CsvRow {
            page: s.page,
            priority: s.priority,
            content: escape(&s.content),
        }
    }
}

/// Strip double quotes and surrounding whitespace.
pub fn escape(content: &str) -> String {
    content.replace('"', "").trim().to_string()
}

/// Output name for a PDF: everything before the first `.`, plus `.csv`.
///
/// `report.2020.pdf` → `report.csv`.
pub fn csv_name_for(filename: &str) -> String {
    let stem = filename.split('.').next().unwrap_or(filename);
    format!("{stem}.csv")
}

/// Shortest representation that parses back to the same `f64` (`0.5`, `1.0`).
fn format_priority(p: f64) -> String {
    format!("{p:?}")
}

/// Render segments as CSV text, header included.
pub fn render(segments: &[ScoredSegment]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + segments.len() * 64);
    out.push_str(HEADER);
    out.push('\n');
    for s in segments {
        // String formatting is infallible.
        let _ = writeln!(
            out,
            "{},{},\"{}\"",
            s.page,
            format_priority(s.priority),
            escape(&s.content)
        );
    }
    out
}

/// Write `segments` to `path` atomically (temp file, then rename).
pub async fn write_segments(
    path: &Path,
    segments: &[ScoredSegment],
) -> Result<(), PreprocessError> {
    let write_err = |e| PreprocessError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path: PathBuf = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, render(segments))
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    debug!("Wrote {} rows to {}", segments.len(), path.display());
    Ok(())
}

fn read_err(path: &Path, e: impl std::fmt::Display) -> PreprocessError {
    PreprocessError::CsvReadFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

fn open(path: &Path) -> Result<::csv::Reader<std::fs::File>, PreprocessError> {
    let mut reader = ::csv::Reader::from_path(path).map_err(|e| read_err(path, e))?;
    let headers = reader.headers().map_err(|e| read_err(path, e))?;
    if !headers.iter().any(|h| h == CONTENT_COLUMN) {
        return Err(PreprocessError::MissingColumn {
            path: path.to_path_buf(),
            column: CONTENT_COLUMN.to_string(),
        });
    }
    Ok(reader)
}

/// Read every row of a segment CSV.
pub fn read_rows(path: &Path) -> Result<Vec<CsvRow>, PreprocessError> {
    let mut reader = open(path)?;
    reader
        .deserialize::<CsvRow>()
        .map(|row| row.map_err(|e| read_err(path, e)))
        .collect()
}

/// Read only the `content` column, in row order.
pub fn read_contents(path: &Path) -> Result<Vec<String>, PreprocessError> {
    let mut reader = open(path)?;
    let idx = reader
        .headers()
        .map_err(|e| read_err(path, e))?
        .iter()
        .position(|h| h == CONTENT_COLUMN)
        .ok_or_else(|| PreprocessError::MissingColumn {
            path: path.to_path_buf(),
            column: CONTENT_COLUMN.to_string(),
        })?;

    let mut contents = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| read_err(path, e))?;
        contents.push(record.get(idx).unwrap_or_default().to_string());
    }
    Ok(contents)
}
