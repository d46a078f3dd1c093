//! Directory-level runs: `pdf2csv`, `trainvec` and `csv2vec`.
//!
//! Files are listed in sorted order and processed one after another. A file
//! that cannot be read (corrupt PDF, missing password, bad CSV) is logged,
//! reported to the progress callback and recorded in
//! [`BatchStats::skipped`]; the run continues. Anything else (pdfium cannot
//! be bound, output not writable, model unusable) aborts the run.

use crate::config::{BatchConfig, Mode};
use crate::error::{FileError, PreprocessError};
use crate::extract::{csv_path_for, extract_to_file};
use crate::output::BatchStats;
use crate::pipeline::csv::read_contents;
use crate::pipeline::input::{discover, file_name_of};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::vector::{write_vectors, ParagraphModel, VectorSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run the configured mode over every matching file of `config.input_dir`.
///
/// # Example
/// ```rust,no_run
/// use sustain_preprocess::{batch, BatchConfig, Mode};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BatchConfig::builder()
///     .mode(Mode::Pdf2Csv)
///     .input_dir("reports/")
///     .output_dir("out/")
///     .build()?;
/// let stats = batch::run(&config).await?;
/// println!("{} CSVs, {} skipped", stats.files_processed, stats.files_skipped());
/// # Ok(())
/// # }
/// ```
pub async fn run(config: &BatchConfig) -> Result<BatchStats, PreprocessError> {
    let start = Instant::now();

    if config.mode == Mode::Csv2Vec && !cfg!(feature = "h5") {
        return Err(PreprocessError::FeatureDisabled {
            operation: "csv2vec",
            feature: "h5",
        });
    }

    let files = discover(&config.input_dir, config.mode.extension())?;
    info!(
        "{}: {} .{} files in {}",
        config.mode,
        files.len(),
        config.mode.extension(),
        config.input_dir.display()
    );

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| PreprocessError::OutputWriteFailed {
            path: config.output_dir.clone(),
            source: e,
        })?;

    let mut run = Run {
        stats: BatchStats {
            mode: config.mode.to_string(),
            files_found: files.len(),
            ..Default::default()
        },
        progress: config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback)),
        total: files.len(),
    };
    run.progress.on_batch_start(files.len());

    match config.mode {
        Mode::Pdf2Csv => pdf2csv(config, &files, &mut run).await?,
        Mode::TrainVec => trainvec(config, &files, &mut run).await?,
        Mode::Csv2Vec => csv2vec(config, &files, &mut run).await?,
    }

    run.progress
        .on_batch_complete(files.len(), run.stats.files_processed);
    run.stats.total_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "{} done: {}/{} files, {} skipped, {}ms",
        config.mode,
        run.stats.files_processed,
        run.stats.files_found,
        run.stats.files_skipped(),
        run.stats.total_duration_ms
    );
    Ok(run.stats)
}

/// Synchronous wrapper around [`run`].
pub fn run_sync(config: &BatchConfig) -> Result<BatchStats, PreprocessError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PreprocessError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}

/// Bookkeeping shared by the three modes.
struct Run {
    stats: BatchStats,
    progress: ProgressCallback,
    total: usize,
}

impl Run {
    fn complete(&mut self, idx: usize, path: &Path, items: usize) {
        self.stats.files_processed += 1;
        self.stats.items += items;
        self.progress.on_file_complete(idx, self.total, path, items);
    }

    /// Record a skipped file, or hand back an error that must abort the run.
    fn skip(
        &mut self,
        idx: usize,
        path: &Path,
        err: PreprocessError,
    ) -> Result<(), PreprocessError> {
        if !err.is_file_local() {
            return Err(err);
        }
        warn!("Skipping {}: {}", path.display(), err);
        self.progress
            .on_file_error(idx, self.total, path, &err.to_string());
        self.stats
            .skipped
            .push(FileError::from((path.to_path_buf(), &err)));
        Ok(())
    }

    fn skip_empty(&mut self, idx: usize, path: &Path, what: &str) {
        warn!("{} is corrupted or empty: {}", path.display(), what);
        self.progress.on_file_error(idx, self.total, path, what);
        self.stats.skipped.push(FileError::Empty {
            path: path.to_path_buf(),
        });
    }
}

async fn pdf2csv(
    config: &BatchConfig,
    files: &[PathBuf],
    run: &mut Run,
) -> Result<(), PreprocessError> {
    for (idx, path) in files.iter().enumerate() {
        run.progress.on_file_start(idx, run.total, path);
        info!("Processing {}", path.display());

        match extract_to_file(path, &config.output_dir, &config.extract).await {
            Ok(stats) if stats.segments == 0 => run.skip_empty(idx, path, "no text segments"),
            Ok(stats) => {
                let out = csv_path_for(&config.output_dir, path);
                if run.stats.outputs.contains(&out) {
                    warn!(
                        "{} overwrote {}, already written earlier in this run",
                        path.display(),
                        out.display()
                    );
                } else {
                    run.stats.outputs.push(out);
                }
                run.complete(idx, path, stats.segments);
            }
            Err(e) => run.skip(idx, path, e)?,
        }
    }
    Ok(())
}

async fn trainvec(
    config: &BatchConfig,
    files: &[PathBuf],
    run: &mut Run,
) -> Result<(), PreprocessError> {
    let model_path = model_path(config)?;

    let mut paragraphs: Vec<String> = Vec::new();
    for (idx, path) in files.iter().enumerate() {
        run.progress.on_file_start(idx, run.total, path);
        match read_contents(path) {
            Ok(rows) if rows.is_empty() => run.skip_empty(idx, path, "no paragraphs"),
            Ok(rows) => {
                let n = rows.len();
                paragraphs.extend(rows);
                run.complete(idx, path, n);
            }
            Err(e) => run.skip(idx, path, e)?,
        }
    }
    info!("Training on {} paragraphs", paragraphs.len());

    let vector_config = config.vector.clone();
    let model =
        tokio::task::spawn_blocking(move || ParagraphModel::fit(&paragraphs, &vector_config))
            .await
            .map_err(|e| PreprocessError::Internal(format!("Training task panicked: {}", e)))??;

    model.save(&model_path)?;
    run.stats.outputs.push(model_path);
    Ok(())
}

async fn csv2vec(
    config: &BatchConfig,
    files: &[PathBuf],
    run: &mut Run,
) -> Result<(), PreprocessError> {
    let model_path = model_path(config)?;
    let model = Arc::new(ParagraphModel::load(&model_path)?);
    info!(
        "Loaded model {} ({} words, {} dims)",
        model_path.display(),
        model.vocab_len(),
        model.vector_size()
    );

    let mut sets = Vec::with_capacity(files.len());
    for (idx, path) in files.iter().enumerate() {
        run.progress.on_file_start(idx, run.total, path);
        let rows = match read_contents(path) {
            Ok(rows) if rows.is_empty() => {
                run.skip_empty(idx, path, "no paragraphs");
                continue;
            }
            Ok(rows) => rows,
            Err(e) => {
                run.skip(idx, path, e)?;
                continue;
            }
        };

        let n = rows.len();
        let name = file_name_of(path);
        let model = Arc::clone(&model);
        let set = tokio::task::spawn_blocking(move || {
            let vectors: Vec<Vec<f32>> = rows.iter().map(|p| model.infer(p)).collect();
            VectorSet::from_rows(name, model.vector_size(), vectors)
        })
        .await
        .map_err(|e| PreprocessError::Internal(format!("Inference task panicked: {}", e)))??;

        sets.push(set);
        run.complete(idx, path, n);
    }

    let out = config.vectors_path();
    let written = tokio::task::spawn_blocking({
        let out = out.clone();
        move || write_vectors(&out, &sets)
    })
    .await
    .map_err(|e| PreprocessError::Internal(format!("Vector write task panicked: {}", e)))??;

    if written > 0 {
        run.stats.outputs.push(out);
    }
    Ok(())
}

fn model_path(config: &BatchConfig) -> Result<PathBuf, PreprocessError> {
    config
        .model_path
        .clone()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| PreprocessError::MissingModelPath {
            mode: config.mode.to_string(),
            role: if config.mode == Mode::TrainVec {
                "output"
            } else {
                "input"
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ScoredSegment;
    use crate::pipeline::csv::write_segments;
    use crate::progress::BatchProgressCallback;
    use crate::VectorConfig;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl BatchProgressCallback for Recorder {
        fn on_batch_start(&self, total_files: usize) {
            self.events.lock().unwrap().push(format!("start {total_files}"));
        }
        fn on_file_complete(&self, idx: usize, _total: usize, _path: &Path, items: usize) {
            self.events.lock().unwrap().push(format!("ok {idx} {items}"));
        }
        fn on_file_error(&self, idx: usize, _total: usize, _path: &Path, _error: &str) {
            self.events.lock().unwrap().push(format!("skip {idx}"));
        }
        fn on_batch_complete(&self, _total_files: usize, succeeded: usize) {
            self.events.lock().unwrap().push(format!("done {succeeded}"));
        }
    }

    async fn write_csv(dir: &Path, name: &str, contents: &[&str]) {
        let segments: Vec<ScoredSegment> = contents
            .iter()
            .enumerate()
            .map(|(i, c)| ScoredSegment {
                filename: "r.pdf".into(),
                page: i,
                content: c.to_string(),
                priority: 1.0,
            })
            .collect();
        write_segments(&dir.join(name), &segments).await.unwrap();
    }

    fn small_vectors() -> VectorConfig {
        VectorConfig::builder().vector_size(8).epochs(5).build().unwrap()
    }

    #[tokio::test]
    async fn pdf2csv_lists_a_reused_csv_once() {
        let _guard = crate::extract::tests::PDFIUM_LOCK.lock().await;
        let Some(pdfium) = crate::extract::tests::try_pdfium() else {
            eprintln!("pdfium not available, skipping");
            return;
        };
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        // Both stems cut at the first '.' to "acme".
        crate::extract::tests::write_sample_pdf(&pdfium, &input.join("acme.pdf"));
        crate::extract::tests::write_sample_pdf(&pdfium, &input.join("acme.2020.pdf"));
        drop(pdfium);

        let out = tmp.path().join("out");
        let config = BatchConfig::builder()
            .input_dir(&input)
            .output_dir(&out)
            .build()
            .unwrap();
        let stats = run(&config).await.unwrap();
        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.outputs, vec![out.join("acme.csv")]);
    }

    #[tokio::test]
    async fn pdf2csv_skips_unreadable_files() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("a.pdf"), b"<html>not a pdf</html>").unwrap();
        std::fs::write(input.join("b.pdf"), b"%P").unwrap();

        let recorder = Arc::new(Recorder::default());
        let config = BatchConfig::builder()
            .input_dir(&input)
            .output_dir(tmp.path().join("out"))
            .progress_callback(recorder.clone())
            .build()
            .unwrap();

        let stats = run(&config).await.unwrap();
        assert_eq!(stats.files_found, 2);
        assert_eq!(stats.files_processed, 0);
        assert_eq!(stats.files_skipped(), 2);
        assert!(tmp.path().join("out").is_dir());
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["start 2", "skip 0", "skip 1", "done 0"]
        );
    }

    #[tokio::test]
    async fn missing_input_dir_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let config = BatchConfig::builder()
            .input_dir(tmp.path().join("nope"))
            .output_dir(tmp.path().join("out"))
            .build()
            .unwrap();
        assert!(matches!(
            run(&config).await.unwrap_err(),
            PreprocessError::InputDirNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn trainvec_writes_model() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("csv");
        write_csv(&input, "a.csv", &["Net zero by 2040.", "Scope 1 emissions fell."]).await;
        write_csv(&input, "b.csv", &["Renewable electricity for offices."]).await;
        write_csv(&input, "c.csv", &[]).await;
        std::fs::write(input.join("d.csv"), "page,text\n0,x\n").unwrap();

        let model_path = tmp.path().join("model.bin");
        let config = BatchConfig::builder()
            .mode(Mode::TrainVec)
            .input_dir(&input)
            .output_dir(tmp.path().join("out"))
            .model_path(&model_path)
            .vector(small_vectors())
            .build()
            .unwrap();

        let stats = run(&config).await.unwrap();
        assert_eq!(stats.files_found, 4);
        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.items, 3);
        assert_eq!(stats.files_skipped(), 2);
        assert!(matches!(stats.skipped[0], FileError::Empty { .. }));
        assert!(matches!(stats.skipped[1], FileError::Unreadable { .. }));
        assert_eq!(stats.outputs, vec![model_path.clone()]);

        let model = ParagraphModel::load(&model_path).unwrap();
        assert_eq!(model.doc_count(), 3);
    }

    #[tokio::test]
    async fn trainvec_without_paragraphs_fails() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("csv");
        write_csv(&input, "empty.csv", &[]).await;
        let config = BatchConfig::builder()
            .mode(Mode::TrainVec)
            .input_dir(&input)
            .output_dir(tmp.path().join("out"))
            .model_path(tmp.path().join("model.bin"))
            .build()
            .unwrap();
        assert!(matches!(
            run(&config).await.unwrap_err(),
            PreprocessError::EmptyCorpus(_)
        ));
    }

    #[tokio::test]
    async fn csv2vec_requires_a_model_file() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("csv");
        write_csv(&input, "a.csv", &["Net zero."]).await;
        let config = BatchConfig::builder()
            .mode(Mode::Csv2Vec)
            .input_dir(&input)
            .output_dir(tmp.path().join("out"))
            .model_path(tmp.path().join("missing.bin"))
            .build()
            .unwrap();
        let err = run(&config).await.unwrap_err();
        if cfg!(feature = "h5") {
            assert!(matches!(err, PreprocessError::ModelReadFailed { .. }));
        } else {
            assert!(matches!(err, PreprocessError::FeatureDisabled { .. }));
        }
    }

    #[cfg(feature = "h5")]
    #[tokio::test]
    async fn csv2vec_writes_one_dataset_per_csv() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("csv");
        write_csv(&input, "acme.csv", &["Net zero by 2040.", "Scope 1 emissions fell."]).await;
        write_csv(&input, "blank.csv", &[]).await;
        write_csv(
            &input,
            "globex.csv",
            &["Renewable electricity.", "Water use fell.", "Safety."],
        )
        .await;

        let model_path = tmp.path().join("model.bin");
        let train = BatchConfig::builder()
            .mode(Mode::TrainVec)
            .input_dir(&input)
            .output_dir(tmp.path().join("out"))
            .model_path(&model_path)
            .vector(small_vectors())
            .build()
            .unwrap();
        run(&train).await.unwrap();

        let infer = BatchConfig::builder()
            .mode(Mode::Csv2Vec)
            .input_dir(&input)
            .output_dir(tmp.path().join("out"))
            .model_path(&model_path)
            .build()
            .unwrap();
        let stats = run(&infer).await.unwrap();
        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.items, 5);
        assert_eq!(stats.outputs, vec![infer.vectors_path()]);

        let sets = crate::vector::load_vectors(&infer.vectors_path()).unwrap();
        let shapes: Vec<(&str, usize, usize)> = sets
            .iter()
            .map(|s| (s.name.as_str(), s.rows, s.dim))
            .collect();
        assert_eq!(shapes, vec![("acme.csv", 2, 8), ("globex.csv", 3, 8)]);
    }
}
