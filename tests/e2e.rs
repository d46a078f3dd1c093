//! End-to-end integration tests for sustain-preprocess.
//!
//! The vector tests run everywhere. Tests that need pdfium generate their
//! own PDFs and skip when no pdfium library can be bound. The test over real
//! reports in `./test_cases/` is gated behind `E2E_ENABLED`.
//!
//! Run with:
//!   PDFIUM_LIB_PATH=/path/to/libpdfium cargo test --test e2e -- --nocapture

use futures::StreamExt;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use sustain_preprocess::pipeline::csv::{read_rows, write_segments};
use sustain_preprocess::{
    batch, extract, extract_stream, BatchConfig, ExtractConfig, Mode, ParagraphModel,
    PreprocessError, ScoredSegment, VectorConfig,
};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio_test::assert_ok;

/// pdfium instances share process-wide library state.
static PDFIUM: Mutex<()> = Mutex::const_new(());

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn bind_pdfium() -> Option<Pdfium> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(p) => Pdfium::bind_to_library(PathBuf::from(p)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    };
    bindings.ok().map(Pdfium::new)
}

/// Skip this test when pdfium cannot be bound.
macro_rules! pdfium_or_skip {
    () => {{
        match bind_pdfium() {
            Some(p) => p,
            None => {
                println!("SKIP — pdfium not available (set PDFIUM_LIB_PATH)");
                return;
            }
        }
    }};
}

/// A two-page report: page 1 has a heading and a paragraph, page 2 is blank.
fn write_report(pdfium: &Pdfium, path: &Path) {
    let mut doc = pdfium.create_new_pdf().unwrap();
    let font = doc.fonts_mut().helvetica();
    {
        let mut page = doc
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .unwrap();
        page.objects_mut()
            .create_text_object(
                PdfPoints::new(72.0),
                PdfPoints::new(760.0),
                "Sustainability \"Highlights\"",
                font,
                PdfPoints::new(30.0),
            )
            .unwrap();
        page.objects_mut()
            .create_text_object(
                PdfPoints::new(72.0),
                PdfPoints::new(500.0),
                "Group emissions decreased by eleven percent compared with the baseline year.",
                font,
                PdfPoints::new(8.0),
            )
            .unwrap();
    }
    doc.pages_mut()
        .create_page_at_end(PdfPagePaperSize::a4())
        .unwrap();
    doc.save_to_file(path).unwrap();
}

fn seg(content: &str) -> ScoredSegment {
    ScoredSegment {
        filename: "fixture.pdf".into(),
        page: 0,
        content: content.into(),
        priority: 1.0,
    }
}

async fn write_fixture_csv(dir: &Path, name: &str, paragraphs: &[&str]) {
    let segments: Vec<ScoredSegment> = paragraphs.iter().map(|p| seg(p)).collect();
    write_segments(&dir.join(name), &segments).await.unwrap();
}

// ── PDF → CSV ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pdf2csv_ranks_and_skips() {
    let _guard = PDFIUM.lock().await;
    let pdfium = pdfium_or_skip!();

    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("reports");
    std::fs::create_dir(&input).unwrap();
    write_report(&pdfium, &input.join("acme.2022.pdf"));
    std::fs::write(input.join("broken.pdf"), b"%PDF-1.7\ngarbage").unwrap();
    std::fs::write(input.join("readme.txt"), b"ignored").unwrap();
    drop(pdfium);

    let out = tmp.path().join("out");
    let config = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(&out)
        .build()
        .unwrap();
    let stats = assert_ok!(batch::run(&config).await);

    assert_eq!(stats.files_found, 2);
    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_skipped(), 1);
    assert!(stats.skipped[0].path().ends_with("broken.pdf"));
    assert_eq!(stats.outputs, vec![out.join("acme.csv")]);

    let text = std::fs::read_to_string(out.join("acme.csv")).unwrap();
    assert!(text.starts_with("page,priority,content\n"));

    let rows = read_rows(&out.join("acme.csv")).unwrap();
    assert!(rows.len() >= 2, "rows: {rows:?}");
    assert!(rows.iter().all(|r| r.page == 0));
    assert!(rows.iter().all(|r| (0.0..=1.0).contains(&r.priority)));
    assert!(rows.iter().all(|r| !r.content.contains('"')));

    let heading = rows
        .iter()
        .find(|r| r.content.starts_with("Sustainability"))
        .unwrap();
    assert_eq!(heading.priority, 1.0);
    assert!(heading.content.contains("Highlights"));
    let body = rows.iter().find(|r| r.content.contains("emissions")).unwrap();
    assert!(body.priority < heading.priority);
}

#[tokio::test]
async fn test_stream_matches_eager() {
    let _guard = PDFIUM.lock().await;
    let pdfium = pdfium_or_skip!();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("acme.pdf");
    write_report(&pdfium, &path);
    drop(pdfium);

    let config = ExtractConfig::default();
    let doc = extract(&path, &config).await.unwrap();
    assert_eq!(doc.stats.total_pages, 2);
    assert_eq!(doc.stats.pages_with_text, 1);

    let pages: Vec<_> = extract_stream(&path, &config)
        .await
        .unwrap()
        .map(|p| p.unwrap())
        .collect()
        .await;
    assert_eq!(pages.iter().map(|p| p.page).collect::<Vec<_>>(), vec![0, 1]);
    assert!(pages[1].segments.is_empty());

    let streamed: Vec<ScoredSegment> = pages.into_iter().flat_map(|p| p.segments).collect();
    assert_eq!(streamed, doc.segments);

    let only_second = ExtractConfig::builder()
        .pages(sustain_preprocess::PageSelection::Single(2))
        .build()
        .unwrap();
    let doc = extract(&path, &only_second).await.unwrap();
    assert!(doc.is_empty());
}

#[tokio::test]
async fn test_malformed_pdf_is_per_file() {
    let _guard = PDFIUM.lock().await;
    let pdfium = pdfium_or_skip!();
    drop(pdfium);

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plain.pdf");
    std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap();
    match extract(&path, &ExtractConfig::default()).await {
        Err(e) => assert!(e.is_file_local(), "got: {e}"),
        Ok(doc) => assert!(doc.is_empty()),
    }
}

// ── CSV → vectors ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_trainvec_then_csv2vec() {
    let tmp = TempDir::new().unwrap();
    let csv_dir = tmp.path().join("csv");
    write_fixture_csv(
        &csv_dir,
        "acme.csv",
        &[
            "Climate Strategy.",
            "We target net zero emissions by 2040.",
            "Scope 1 emissions fell by 12%.",
        ],
    )
    .await;
    write_fixture_csv(
        &csv_dir,
        "globex.csv",
        &["Water stewardship.", "Water withdrawals fell at every site."],
    )
    .await;

    let model_path = tmp.path().join("model.bin");
    let vectors = VectorConfig::builder()
        .vector_size(12)
        .epochs(8)
        .build()
        .unwrap();

    let train = BatchConfig::builder()
        .mode(Mode::TrainVec)
        .input_dir(&csv_dir)
        .output_dir(&csv_dir)
        .model_path(&model_path)
        .vector(vectors)
        .build()
        .unwrap();
    let stats = assert_ok!(batch::run(&train).await);
    assert_eq!(stats.items, 5);

    let model = ParagraphModel::load(&model_path).unwrap();
    assert_eq!(model.doc_count(), 5);
    assert_eq!(model.vector_size(), 12);
    assert_eq!(model.infer("Water."), model.infer("Water."));

    let embed = BatchConfig::builder()
        .mode(Mode::Csv2Vec)
        .input_dir(&csv_dir)
        .output_dir(&csv_dir)
        .model_path(&model_path)
        .build()
        .unwrap();

    #[cfg(feature = "h5")]
    {
        let stats = assert_ok!(batch::run(&embed).await);
        assert_eq!(stats.files_processed, 2);
        let sets = sustain_preprocess::vector::load_vectors(&embed.vectors_path()).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!((sets[0].name.as_str(), sets[0].rows, sets[0].dim), ("acme.csv", 3, 12));
        assert_eq!((sets[1].name.as_str(), sets[1].rows, sets[1].dim), ("globex.csv", 2, 12));
        let expected = model.infer("We target net zero emissions by 2040.");
        assert_eq!(sets[0].row(1).unwrap(), expected.as_slice());

        let stacked = sustain_preprocess::vector::stack_vectors(&sets).unwrap();
        assert_eq!((stacked.rows, stacked.dim), (5, 12));
    }

    #[cfg(not(feature = "h5"))]
    {
        let err = batch::run(&embed).await.unwrap_err();
        assert!(matches!(err, PreprocessError::FeatureDisabled { .. }));
    }
}

#[tokio::test]
async fn test_vector_modes_need_model_path() {
    for mode in [Mode::TrainVec, Mode::Csv2Vec] {
        let err = BatchConfig::builder()
            .mode(mode)
            .no_model_path()
            .build()
            .unwrap_err();
        assert!(matches!(err, PreprocessError::MissingModelPath { .. }));
    }
    assert_ok!(BatchConfig::builder().no_model_path().build());
}

// ── Real reports ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_real_reports() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let input = test_cases_dir();
    if !input.is_dir() {
        println!("SKIP — no test_cases/ directory");
        return;
    }
    let _guard = PDFIUM.lock().await;

    let tmp = TempDir::new().unwrap();
    let config = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(tmp.path())
        .build()
        .unwrap();
    let stats = batch::run(&config).await.unwrap();
    println!("{}", serde_json::to_string_pretty(&stats).unwrap());

    for csv in &stats.outputs {
        let rows = read_rows(csv).unwrap();
        assert!(!rows.is_empty(), "{} has no rows", csv.display());
        assert!(rows.iter().any(|r| r.priority == 1.0));
    }
}
