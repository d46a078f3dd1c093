//! # sustain-preprocess
//!
//! Turn a collection of sustainability-report PDFs into ranked text segments
//! and paragraph vectors.
//!
//! ## Why rank by density?
//!
//! Font sizes reported by PDF producers are unreliable, but geometry is not:
//! a title spreads a few characters over a large box while body text packs
//! many characters into the same area. Each text block gets the page-local
//! percentile of its area-per-character, so headings float to priority 1.0
//! and dense body text sinks, without trusting any font metadata.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    list the directory, check %PDF magic bytes
//!  ├─ 2. Layout   pdfium text spans → lines → blocks (spawn_blocking)
//!  ├─ 3. Rank     density percentile per page, newline normalization
//!  ├─ 4. CSV      page,priority,content per document
//!  └─ 5. Vectors  PV-DBOW model (trainvec) → output.h5 (csv2vec)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sustain_preprocess::{extract, ExtractConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let doc = extract("annual-report.pdf", &ExtractConfig::default()).await?;
//!     for s in &doc.segments {
//!         println!("{} {:.2} {}", s.page, s.priority, s.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `preprocess` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `h5`    | on      | HDF5 vector output for `csv2vec` (needs libhdf5) |
//!
//! Library-only users without libhdf5:
//! ```toml
//! sustain-preprocess = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;
pub mod vector;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    BatchConfig, BatchConfigBuilder, ExtractConfig, ExtractConfigBuilder, Mode, PageSelection,
    PercentileKind, VectorConfig, VectorConfigBuilder,
};
pub use error::{FileError, PreprocessError};
pub use extract::{extract, extract_from_bytes, extract_sync, extract_to_file};
pub use output::{BatchStats, DocumentSegments, ExtractStats, PageSegments, ScoredSegment};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{extract_stream, PageStream};
pub use vector::{ParagraphModel, VectorSet};
