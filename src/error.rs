//! Error types for the sustain-preprocess library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PreprocessError`] — returned as `Err(..)` from every library entry
//!   point. Some variants only concern the file being processed (a corrupt
//!   PDF, a missing password); others make the whole run pointless (pdfium
//!   cannot be loaded, the output directory is not writable).
//!   [`PreprocessError::is_file_local`] tells the two apart.
//!
//! * [`FileError`] — **Non-fatal**: the record the batch runner keeps for a
//!   file it skipped. Stored inside [`crate::output::BatchStats`] so callers
//!   can report partial success instead of losing a whole directory to one
//!   unreadable report.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the sustain-preprocess library.
#[derive(Debug, Error)]
pub enum PreprocessError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input directory does not exist or is not a directory.
    #[error("Input directory not found: '{path}'\nPass an existing directory with -i <DIR>.")]
    InputDirNotFound { path: PathBuf },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not open the document (corrupt or unsupported media).
    #[error("Failed to read '{path}', probably unsupported PDF media: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium returned an error while reading one page's objects.
    #[error("Reading page {page} of '{path}' failed: {detail}")]
    PageReadFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
binary, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── CSV errors ────────────────────────────────────────────────────────
    /// A CSV input could not be opened or parsed.
    #[error("Failed to read CSV '{path}': {detail}")]
    CsvReadFailed { path: PathBuf, detail: String },

    /// A CSV input lacks a column the mode needs.
    #[error("CSV '{path}' has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Vector errors ─────────────────────────────────────────────────────
    /// `trainvec` / `csv2vec` were requested without a model path.
    #[error("Need to specify the {role} pretrained model with --model for mode '{mode}'")]
    MissingModelPath { mode: String, role: &'static str },

    /// The model file could not be read or decoded.
    #[error("Failed to load model '{path}': {detail}")]
    ModelReadFailed { path: PathBuf, detail: String },

    /// The model file could not be encoded or written.
    #[error("Failed to save model '{path}': {detail}")]
    ModelWriteFailed { path: PathBuf, detail: String },

    /// Nothing to train on.
    #[error("No trainable text: {0}")]
    EmptyCorpus(String),

    /// HDF5 store failure.
    #[error("Vector store '{path}': {detail}")]
    VectorStore { path: PathBuf, detail: String },

    /// The requested operation needs a cargo feature that was not compiled in.
    #[error("'{operation}' requires the '{feature}' feature; rebuild with --features {feature}")]
    FeatureDisabled {
        operation: &'static str,
        feature: &'static str,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PreprocessError {
    /// `true` when the error only concerns the file being processed, so a
    /// batch can log it, skip the file, and carry on with the next one.
    pub fn is_file_local(&self) -> bool {
        matches!(
            self,
            PreprocessError::FileNotFound { .. }
                | PreprocessError::PermissionDenied { .. }
                | PreprocessError::NotAPdf { .. }
                | PreprocessError::CorruptPdf { .. }
                | PreprocessError::PasswordRequired { .. }
                | PreprocessError::WrongPassword { .. }
                | PreprocessError::PageOutOfRange { .. }
                | PreprocessError::PageReadFailed { .. }
                | PreprocessError::CsvReadFailed { .. }
                | PreprocessError::MissingColumn { .. }
        )
    }
}

/// A non-fatal error for a single input file.
///
/// Stored in [`crate::output::BatchStats::skipped`]; the batch continues.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The file could not be read at all.
    #[error("{path}: {detail}")]
    Unreadable { path: PathBuf, detail: String },

    /// The file was read but produced nothing to write.
    #[error("{path}: no text blocks found, file is corrupted or image-only")]
    Empty { path: PathBuf },
}

impl FileError {
    /// Path of the skipped file.
    pub fn path(&self) -> &PathBuf {
        match self {
            FileError::Unreadable { path, .. } | FileError::Empty { path } => path,
        }
    }
}

impl From<(PathBuf, &PreprocessError)> for FileError {
    fn from((path, err): (PathBuf, &PreprocessError)) -> Self {
        FileError::Unreadable {
            path,
            detail: err.to_string(),
        }
    }
}
