//! Block ranking: score each text block of a page by relative density.
//!
//! The density of a block is its area divided by its character count. Large
//! type spreads few characters over a big area; body text packs many
//! characters into the same space. Ranking densities *within a page* gives a
//! font-size proxy that does not depend on font metadata, which pdfium does
//! not report reliably for every producer.
//!
//! Priorities are page-local: a block is only ever compared with the other
//! text blocks of its own page.

use crate::config::PercentileKind;
use crate::output::{PageSegments, ScoredSegment};
use crate::pipeline::layout::{BlockKind, RawBlock};
use tracing::debug;

/// A text block with its computed density. Lives only while a page is ranked.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub filename: String,
    pub tl: (f64, f64),
    pub br: (f64, f64),
    pub w: f64,
    pub h: f64,
    pub content: String,
    pub kind: BlockKind,
    pub density: f64,
}

impl TextBlock {
    /// Build a rankable block, or `None` for non-text and zero-length blocks.
    pub fn from_raw(filename: &str, raw: &RawBlock) -> Option<TextBlock> {
        if raw.kind != BlockKind::Text {
            return None;
        }
        let chars = raw.content.chars().count();
        if chars == 0 {
            return None;
        }
        let (w, h) = (raw.bbox.width(), raw.bbox.height());
        Some(TextBlock {
            filename: filename.to_string(),
            tl: raw.bbox.top_left(),
            br: raw.bbox.bottom_right(),
            w,
            h,
            content: raw.content.clone(),
            kind: raw.kind,
            density: (w * h) / chars as f64,
        })
    }
}

/// Percentile (0–100) of `score` relative to `values`.
///
/// Returns 0 for an empty `values`.
pub fn percentile_of_score(values: &[f64], score: f64, kind: PercentileKind) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let left = values.iter().filter(|&&v| v < score).count();
    let right = values.iter().filter(|&&v| v <= score).count();
    let n = n as f64;
    match kind {
        PercentileKind::Weak => right as f64 / n * 100.0,
        PercentileKind::Strict => left as f64 / n * 100.0,
        PercentileKind::Mean => (left + right) as f64 / n * 50.0,
        PercentileKind::Rank => {
            let tie = usize::from(right > left);
            (left + right + tie) as f64 * 50.0 / n
        }
    }
}

/// Replace newlines with `". "` and trim surrounding whitespace.
pub fn normalize_content(content: &str) -> String {
    content.replace('\n', ". ").trim().to_string()
}

/// Rank one page's raw blocks.
///
/// Image blocks and zero-length text blocks are dropped before densities are
/// computed; the remaining blocks keep their input order.
///
/// Priority is the percentile divided by 100, so for distinct densities it is
/// `k/N` up to float rounding (1/3 comes out as `0.33333333333333337`). The
/// densest block always gets exactly 1.0.
pub fn rank_page(
    filename: &str,
    page: usize,
    blocks: &[RawBlock],
    kind: PercentileKind,
) -> PageSegments {
    let image_blocks = blocks.iter().filter(|b| b.kind != BlockKind::Text).count();
    let text_blocks: Vec<TextBlock> = blocks
        .iter()
        .filter_map(|b| TextBlock::from_raw(filename, b))
        .collect();
    let empty_blocks = blocks.len() - image_blocks - text_blocks.len();

    let densities: Vec<f64> = text_blocks.iter().map(|b| b.density).collect();

    let segments: Vec<ScoredSegment> = text_blocks
        .into_iter()
        .map(|block| {
            let priority = percentile_of_score(&densities, block.density, kind) / 100.0;
            ScoredSegment {
                filename: block.filename,
                page,
                content: normalize_content(&block.content),
                priority,
            }
        })
        .collect();

    debug!(
        "{} p{}: {} segments ({} image, {} empty blocks skipped)",
        filename,
        page,
        segments.len(),
        image_blocks,
        empty_blocks
    );

    PageSegments {
        page,
        segments,
        empty_blocks,
        image_blocks,
    }
}
