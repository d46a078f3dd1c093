//! Output types: ranked segments, per-document results, and batch statistics.

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The unit of extracted text: one ranked block, page-flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSegment {
    /// Base name of the source PDF.
    pub filename: String,
    /// 0-indexed page number.
    pub page: usize,
    /// Block text with newlines replaced by `". "` and trimmed.
    pub content: String,
    /// Page-local percentile of the block's density, in `[0, 1]`.
    pub priority: f64,
}

/// Segments of a single page, as emitted by [`crate::stream::extract_stream`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSegments {
    /// 0-indexed page number.
    pub page: usize,
    pub segments: Vec<ScoredSegment>,
    /// Text blocks dropped because they had no characters.
    pub empty_blocks: usize,
    /// Image blocks dropped before ranking.
    pub image_blocks: usize,
}

/// Counters collected while extracting one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractStats {
    /// Pages in the PDF.
    pub total_pages: usize,
    /// Pages that were read and ranked.
    pub ranked_pages: usize,
    /// Pages that contributed at least one segment.
    pub pages_with_text: usize,
    /// Image blocks excluded from ranking.
    pub image_blocks: usize,
    /// Zero-length text blocks skipped.
    pub empty_blocks: usize,
    /// Segments emitted.
    pub segments: usize,
    /// Wall-clock time spent in pdfium plus ranking.
    pub duration_ms: u64,
}

impl ExtractStats {
    pub(crate) fn record_page(&mut self, page: &PageSegments) {
        self.ranked_pages += 1;
        if !page.segments.is_empty() {
            self.pages_with_text += 1;
        }
        self.image_blocks += page.image_blocks;
        self.empty_blocks += page.empty_blocks;
        self.segments += page.segments.len();
    }
}

/// The ranked contents of one PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSegments {
    /// Base name of the source PDF.
    pub filename: String,
    /// All segments in page-then-block order.
    pub segments: Vec<ScoredSegment>,
    pub stats: ExtractStats,
}

impl DocumentSegments {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

/// Summary of a directory-level run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub mode: String,
    /// Input files matching the mode's extension.
    pub files_found: usize,
    /// Files that produced output.
    pub files_processed: usize,
    /// Files skipped, with the reason.
    pub skipped: Vec<FileError>,
    /// Files written (CSVs, model file, or `output.h5`).
    pub outputs: Vec<PathBuf>,
    /// Segments written (`pdf2csv`) or paragraphs read (vector modes).
    pub items: usize,
    pub total_duration_ms: u64,
}

impl BatchStats {
    pub fn files_skipped(&self) -> usize {
        self.skipped.len()
    }
}
