//! Eager (full-document) extraction entry points.
//!
//! Opens a PDF with pdfium, groups each selected page into blocks, ranks
//! them and returns every segment at once. Use
//! [`crate::stream::extract_stream`] to receive pages as they are ranked.
//!
//! pdfium is not async-safe, so the async functions here move all pdfium
//! work onto tokio's blocking pool. Each call binds its own pdfium instance.

use crate::config::{pdfium_lib_override, ExtractConfig, PageSelection};
use crate::error::PreprocessError;
use crate::output::{DocumentSegments, ExtractStats, PageSegments};
use crate::pipeline::csv::{csv_name_for, write_segments};
use crate::pipeline::input::{file_name_of, resolve_local};
use crate::pipeline::layout::{read_page_blocks, LayoutParams};
use crate::pipeline::rank::rank_page;
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rank every selected page of a PDF.
///
/// # Errors
/// Per-document failures (not a PDF, corrupt, password) and fatal ones
/// (pdfium cannot be bound). A document without any text is **not** an
/// error; it yields an empty [`DocumentSegments`].
///
/// # Example
/// ```rust,no_run
/// use sustain_preprocess::{extract, ExtractConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let doc = extract("report.pdf", &ExtractConfig::default()).await?;
/// for s in doc.segments.iter().filter(|s| s.priority == 1.0) {
///     println!("p{} {}", s.page, s.content);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    path: impl AsRef<Path>,
    config: &ExtractConfig,
) -> Result<DocumentSegments, PreprocessError> {
    let path = path.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || extract_blocking(&path, &config))
        .await
        .map_err(|e| PreprocessError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    path: impl AsRef<Path>,
    config: &ExtractConfig,
) -> Result<DocumentSegments, PreprocessError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PreprocessError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(path, config))
}

/// Rank PDF bytes held in memory.
///
/// The bytes are written to a managed temp file named `filename`, which is
/// also the `filename` reported on every segment.
pub async fn extract_from_bytes(
    bytes: &[u8],
    filename: &str,
    config: &ExtractConfig,
) -> Result<DocumentSegments, PreprocessError> {
    let dir = tempfile::TempDir::new()
        .map_err(|e| PreprocessError::Internal(format!("tempdir: {e}")))?;
    let path = dir.path().join(filename);
    let mut file = std::fs::File::create(&path)
        .map_err(|e| PreprocessError::Internal(format!("tempfile: {e}")))?;
    file.write_all(bytes)
        .map_err(|e| PreprocessError::Internal(format!("tempfile write: {e}")))?;
    drop(file);
    // `dir` is removed when it drops, after extraction has finished
    extract(&path, config).await
}

/// Where [`extract_to_file`] writes the CSV for `pdf` inside `out_dir`.
pub fn csv_path_for(out_dir: &Path, pdf: &Path) -> PathBuf {
    out_dir.join(csv_name_for(&file_name_of(pdf)))
}

/// Rank a PDF and write its segments to `<out_dir>/<stem>.csv`.
///
/// The stem is the file name up to its first `.`. The write is atomic
/// (temp file, then rename). No file is written when the document yields
/// no segments; check `stats.segments`.
pub async fn extract_to_file(
    path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    config: &ExtractConfig,
) -> Result<ExtractStats, PreprocessError> {
    let path = path.as_ref();
    let doc = extract(path, config).await?;
    if doc.is_empty() {
        warn!("{}: no text segments, nothing written", doc.filename);
        return Ok(doc.stats);
    }
    let out = csv_path_for(out_dir.as_ref(), path);
    write_segments(&out, &doc.segments).await?;
    info!("Wrote {} segments to {}", doc.len(), out.display());
    Ok(doc.stats)
}

// ── Blocking core ────────────────────────────────────────────────────────

fn extract_blocking(
    path: &Path,
    config: &ExtractConfig,
) -> Result<DocumentSegments, PreprocessError> {
    let start = Instant::now();
    let filename = file_name_of(path);
    let mut segments = Vec::new();
    let mut stats = ExtractStats::default();

    let total_pages = for_each_page(path, config, |page| {
        stats.record_page(&page);
        segments.extend(page.segments);
        true
    })?;
    stats.total_pages = total_pages;
    stats.duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "{}: {} segments from {}/{} pages in {}ms",
        filename, stats.segments, stats.pages_with_text, stats.total_pages, stats.duration_ms
    );

    Ok(DocumentSegments {
        filename,
        segments,
        stats,
    })
}

/// Open `path`, then rank each selected page in order and hand it to
/// `on_page`. Stops early when `on_page` returns `false`.
///
/// Returns the total page count of the document.
pub(crate) fn for_each_page<F>(
    path: &Path,
    config: &ExtractConfig,
    mut on_page: F,
) -> Result<usize, PreprocessError>
where
    F: FnMut(PageSegments) -> bool,
{
    let path = resolve_local(path)?;
    let filename = file_name_of(&path);
    let pdfium = bind_pdfium(pdfium_lib_override(config).as_deref())?;
    let document = open_document(&pdfium, &path, config.password.as_deref())?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let indices = config.pages.to_indices(total_pages);
    if indices.is_empty() && total_pages > 0 {
        return Err(PreprocessError::PageOutOfRange {
            page: first_requested(&config.pages),
            total: total_pages,
        });
    }
    debug!("{}: {} pages, {} selected", filename, total_pages, indices.len());

    let params = LayoutParams::from(config);
    for idx in indices {
        let page_err = |e: PdfiumError| PreprocessError::PageReadFailed {
            path: path.clone(),
            page: idx,
            detail: format!("{:?}", e),
        };
        let page = pages.get(idx as u16).map_err(page_err)?;
        let blocks = read_page_blocks(&page, &params).map_err(page_err)?;
        let ranked = rank_page(&filename, idx, &blocks, config.percentile);
        if !on_page(ranked) {
            debug!("{}: consumer stopped after page {}", filename, idx);
            break;
        }
    }

    Ok(total_pages)
}

fn first_requested(pages: &PageSelection) -> usize {
    match pages {
        PageSelection::All => 1,
        PageSelection::Single(p) | PageSelection::Range(p, _) => *p,
        PageSelection::Set(v) => v.first().copied().unwrap_or(0),
    }
}

/// Bind pdfium: the explicit override, then `./`, then the system library.
fn bind_pdfium(lib_override: Option<&Path>) -> Result<Pdfium, PreprocessError> {
    let bindings = match lib_override {
        Some(p) => {
            let lib = if p.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(p)
            } else {
                p.to_path_buf()
            };
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PreprocessError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PreprocessError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PreprocessError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                PreprocessError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            PreprocessError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}
