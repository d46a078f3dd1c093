//! Page layout: rebuild paragraph-like blocks from pdfium text runs.
//!
//! pdfium reports text as segments (runs of characters sharing a baseline
//! and font), not as paragraphs. Density ranking needs paragraph-sized blocks
//! (a heading, a caption, a body paragraph), so runs are regrouped in two
//! passes, following pdfminer's layout analysis:
//!
//! 1. **runs → lines**: two runs belong to the same line when they overlap
//!    vertically by at least half the smaller height and the horizontal gap
//!    is at most `char_margin × height`.
//! 2. **lines → blocks**: a line continues the current block when it
//!    overlaps the previous line horizontally, sits at most
//!    `line_margin × height` below it, and the two heights are within
//!    `max_height_ratio` of each other.
//!
//! Image objects are reported as [`BlockKind::Image`] blocks; the ranker
//! drops them.
//!
//! All geometry in this module uses a top-left origin with `y` growing
//! downwards, in PDF points.

use crate::config::ExtractConfig;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Axis-aligned rectangle, top-left origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn top_left(&self) -> (f64, f64) {
        (self.x0, self.y0)
    }

    pub fn bottom_right(&self) -> (f64, f64) {
        (self.x1, self.y1)
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn is_hoverlap(&self, other: &BoundingBox) -> bool {
        other.x0 <= self.x1 && self.x0 <= other.x1
    }

    /// Horizontal gap to `other`; 0 when they overlap.
    pub fn hdistance(&self, other: &BoundingBox) -> f64 {
        if self.is_hoverlap(other) {
            0.0
        } else {
            (self.x0 - other.x1).abs().min((self.x1 - other.x0).abs())
        }
    }

    /// Height of the shared vertical band; 0 when disjoint.
    pub fn voverlap(&self, other: &BoundingBox) -> f64 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }

    /// Vertical gap to `other`; 0 when they overlap.
    pub fn vdistance(&self, other: &BoundingBox) -> f64 {
        if self.voverlap(other) > 0.0 {
            0.0
        } else {
            (self.y0 - other.y1).abs().min((self.y1 - other.y0).abs())
        }
    }
}

/// Kind tag of a raw block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Image,
}

/// A block as delivered by the layout stage, before ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub kind: BlockKind,
    pub bbox: BoundingBox,
    /// Lines of the block, each terminated by `\n`. Empty for images.
    pub content: String,
}

impl RawBlock {
    pub fn text(bbox: BoundingBox, content: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Text,
            bbox,
            content: content.into(),
        }
    }

    pub fn image(bbox: BoundingBox) -> Self {
        Self {
            kind: BlockKind::Image,
            bbox,
            content: String::new(),
        }
    }
}

/// A text run with its rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub bbox: BoundingBox,
}

impl Span {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Grouping thresholds, extracted from [`ExtractConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub line_margin: f64,
    pub char_margin: f64,
    pub max_height_ratio: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        LayoutParams::from(&ExtractConfig::default())
    }
}

impl From<&ExtractConfig> for LayoutParams {
    fn from(c: &ExtractConfig) -> Self {
        Self {
            line_margin: f64::from(c.line_margin),
            char_margin: f64::from(c.char_margin),
            max_height_ratio: f64::from(c.max_height_ratio),
        }
    }
}

#[derive(Debug)]
struct Line {
    text: String,
    bbox: BoundingBox,
}

impl Line {
    fn accepts(&self, span: &Span, params: &LayoutParams) -> bool {
        let min_h = self.bbox.height().min(span.bbox.height());
        let max_h = self.bbox.height().max(span.bbox.height());
        self.bbox.voverlap(&span.bbox) >= 0.5 * min_h
            && self.bbox.hdistance(&span.bbox) <= params.char_margin * max_h
    }

    fn push(&mut self, span: Span) {
        // Runs often carry their own separating space.
        if !self.text.ends_with(char::is_whitespace)
            && !span.text.starts_with(char::is_whitespace)
        {
            self.text.push(' ');
        }
        self.text.push_str(&span.text);
        self.bbox = self.bbox.union(&span.bbox);
    }
}

#[derive(Debug)]
struct Block {
    lines: Vec<Line>,
    bbox: BoundingBox,
}

impl Block {
    fn accepts(&self, line: &Line, params: &LayoutParams) -> bool {
        let Some(last) = self.lines.last() else {
            return false;
        };
        let (h_last, h_line) = (last.bbox.height(), line.bbox.height());
        let (lo, hi) = (h_last.min(h_line), h_last.max(h_line));
        if lo <= 0.0 || hi / lo > params.max_height_ratio {
            return false;
        }
        // Lines must flow downwards; a line above the block starts a new column.
        line.bbox.y0 >= last.bbox.y0
            && last.bbox.is_hoverlap(&line.bbox)
            && last.bbox.vdistance(&line.bbox) <= params.line_margin * hi
    }

    fn into_raw(self) -> RawBlock {
        let mut content = String::new();
        for line in &self.lines {
            content.push_str(line.text.trim_end());
            content.push('\n');
        }
        RawBlock::text(self.bbox, content)
    }
}

/// Group text runs (in pdfium's reading order) into text blocks.
///
/// Runs that contain only whitespace are dropped; they carry no characters
/// and no useful geometry.
pub fn group_spans(spans: Vec<Span>, params: &LayoutParams) -> Vec<RawBlock> {
    let mut lines: Vec<Line> = Vec::new();
    for span in spans {
        if span.text.trim().is_empty() {
            continue;
        }
        match lines.last_mut() {
            Some(line) if line.accepts(&span, params) => line.push(span),
            _ => lines.push(Line {
                text: span.text,
                bbox: span.bbox,
            }),
        }
    }

    let mut blocks: Vec<Block> = Vec::new();
    for line in lines {
        match blocks.last_mut() {
            Some(block) if block.accepts(&line, params) => {
                block.bbox = block.bbox.union(&line.bbox);
                block.lines.push(line);
            }
            _ => blocks.push(Block {
                bbox: line.bbox,
                lines: vec![line],
            }),
        }
    }

    blocks.into_iter().map(Block::into_raw).collect()
}

/// Convert a pdfium rectangle (bottom-left origin) into a top-left box.
fn flip(rect: &PdfRect, page_height: f64) -> BoundingBox {
    BoundingBox::new(
        f64::from(rect.left().value),
        page_height - f64::from(rect.top().value),
        f64::from(rect.right().value),
        page_height - f64::from(rect.bottom().value),
    )
}

/// Read one page's blocks: grouped text blocks first, then image blocks.
pub fn read_page_blocks(
    page: &PdfPage,
    params: &LayoutParams,
) -> Result<Vec<RawBlock>, PdfiumError> {
    let page_height = f64::from(page.height().value);

    let text = page.text()?;
    let spans: Vec<Span> = text
        .segments()
        .iter()
        .map(|segment| Span::new(segment.text(), flip(&segment.bounds(), page_height)))
        .collect();
    let span_count = spans.len();

    let mut blocks = group_spans(spans, params);
    let text_blocks = blocks.len();

    for object in page.objects().iter() {
        if object.object_type() == PdfPageObjectType::Image {
            let bbox = object
                .bounds()
                .map(|quad| flip(&quad.to_rect(), page_height))
                .unwrap_or_default();
            blocks.push(RawBlock::image(bbox));
        }
    }

    debug!(
        "Page layout: {} runs → {} text blocks, {} image blocks",
        span_count,
        text_blocks,
        blocks.len() - text_blocks
    );

    Ok(blocks)
}
