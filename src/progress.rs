//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the batch runner walks the input directory.
//!
//! # Example
//!
//! ```rust
//! use sustain_preprocess::{BatchConfig, BatchProgressCallback};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, _idx: usize, total: usize, path: &Path, items: usize) {
//!         let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}/{total} {} ({items} rows)", path.display());
//!     }
//! }
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the batch runner as it processes each input file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`; the runner
/// holds the callback across `.await` points.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after the input directory has been listed.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is opened.
    ///
    /// # Arguments
    /// * `idx`   — 0-indexed position of the file in the sorted listing
    /// * `total` — number of files in the batch
    fn on_file_start(&self, idx: usize, total: usize, path: &Path) {
        let _ = (idx, total, path);
    }

    /// Called when a file has been fully processed.
    ///
    /// `items` is the number of segments written (`pdf2csv`) or paragraphs
    /// read (`trainvec`, `csv2vec`).
    fn on_file_complete(&self, idx: usize, total: usize, path: &Path, items: usize) {
        let _ = (idx, total, path, items);
    }

    /// Called when a file is skipped. The batch continues.
    fn on_file_error(&self, idx: usize, total: usize, path: &Path, error: &str) {
        let _ = (idx, total, path, error);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, total_files: usize, succeeded: usize) {
        let _ = (total_files, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
