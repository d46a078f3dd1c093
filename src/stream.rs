//! Streaming extraction API: emit pages as soon as they are ranked.
//!
//! [`extract_stream`] yields one [`PageSegments`] per selected page, in page
//! order, while pdfium is still working through the rest of the document.
//! Useful for long reports where callers want to write or display partial
//! results instead of buffering everything.

use crate::config::ExtractConfig;
use crate::error::PreprocessError;
use crate::extract::for_each_page;
use crate::output::PageSegments;
use crate::pipeline::input::resolve_local;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of ranked pages.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageSegments, PreprocessError>> + Send>>;

/// Pages buffered between the pdfium thread and the consumer.
const CHANNEL_CAPACITY: usize = 4;

/// Rank a PDF, streaming pages as they are ready.
///
/// # Returns
/// - `Ok(PageStream)` — pages in order; a document-level failure (corrupt,
///   password, pdfium binding) arrives as the stream's only `Err` item
/// - `Err(PreprocessError)` — the path is missing or is not a PDF
///
/// Dropping the stream stops extraction after the page in progress.
///
/// # Example
/// ```rust,no_run
/// use sustain_preprocess::{extract_stream, ExtractConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut pages = extract_stream("report.pdf", &ExtractConfig::default()).await?;
/// while let Some(page) = pages.next().await {
///     let page = page?;
///     println!("page {}: {} segments", page.page, page.segments.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract_stream(
    path: impl AsRef<std::path::Path>,
    config: &ExtractConfig,
) -> Result<PageStream, PreprocessError> {
    let path = resolve_local(path.as_ref())?;
    info!("Starting streaming extraction: {}", path.display());

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let config = config.clone();

    tokio::task::spawn_blocking(move || {
        let result = for_each_page(&path, &config, |page| tx.blocking_send(Ok(page)).is_ok());
        match result {
            Ok(total) => debug!("{}: stream finished ({} pages)", path.display(), total),
            Err(e) => {
                // The receiver may already be gone; nothing left to report to.
                let _ = tx.blocking_send(Err(e));
            }
        }
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::{try_pdfium, write_sample_pdf, PDFIUM_LOCK};
    use futures::StreamExt;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_fails_before_streaming() {
        let result = extract_stream("/nonexistent/report.pdf", &ExtractConfig::default()).await;
        assert!(matches!(result, Err(PreprocessError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn streams_pages_in_order() {
        let _guard = PDFIUM_LOCK.lock().await;
        let Some(pdfium) = try_pdfium() else {
            eprintln!("pdfium not available, skipping");
            return;
        };
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("streamed.pdf");
        write_sample_pdf(&pdfium, &path);
        drop(pdfium);

        let pages: Vec<PageSegments> = extract_stream(&path, &ExtractConfig::default())
            .await
            .unwrap()
            .map(|p| p.unwrap())
            .collect()
            .await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page, 0);
        assert!(!pages[0].segments.is_empty());
    }
}
