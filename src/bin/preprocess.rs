//! CLI binary for sustain-preprocess.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! runs one mode over a directory and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sustain_preprocess::{
    batch, config::default_input_dir, BatchConfig, BatchProgressCallback, ExtractConfig, Mode,
    PageSelection, PercentileKind, ProgressCallback, VectorConfig,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-file start times, keyed by position in the batch.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
    /// What a unit of work is called in the per-file lines.
    unit: &'static str,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` reports how many files there are.
    fn new_dynamic(mode: Mode) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Listing input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
            unit: match mode {
                Mode::Pdf2Csv => "segments",
                Mode::Csv2Vec | Mode::TrainVec => "paragraphs",
            },
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Processing");
        self.bar.reset_eta();
    }

    fn elapsed_ms(&self, idx: usize) -> u128 {
        self.start_times
            .lock()
            .map(|mut m| m.remove(&idx))
            .ok()
            .flatten()
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }
}

fn short_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.activate_bar(total_files);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_files} files…"))
        ));
    }

    fn on_file_start(&self, idx: usize, _total: usize, path: &Path) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(idx, Instant::now());
        }
        self.bar.set_message(short_name(path));
    }

    fn on_file_complete(&self, idx: usize, total: usize, path: &Path, items: usize) {
        let elapsed_ms = self.elapsed_ms(idx);
        self.bar.println(format!(
            "  {} {:>4}/{:<4} {:<40} {}  {}",
            green("✓"),
            idx + 1,
            total,
            short_name(path),
            dim(&format!("{items:>6} {}", self.unit)),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, idx: usize, total: usize, path: &Path, error: &str) {
        let elapsed_ms = self.elapsed_ms(idx);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep the line readable for long pdfium messages.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>4}/{:<4} {:<40} {}  {}",
            red("✗"),
            idx + 1,
            total,
            short_name(path),
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, succeeded: usize) {
        let failed = total_files.saturating_sub(succeeded);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} files processed successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files processed  ({} skipped)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&succeeded.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rank every PDF in ~/data/sustain/all/ into out/*.csv
  preprocess

  # Explicit directories
  preprocess -i reports/ -o csv/

  # Train paragraph vectors on the CSVs
  preprocess -m trainvec -i csv/ --model model.bin

  # Embed every paragraph into csv/output.h5
  preprocess -m csv2vec -i csv/ -o csv/ --model model.bin

  # Only the first ten pages, rank-style percentiles
  preprocess --pages 1-10 --percentile rank

  # Machine-readable summary
  preprocess --json > stats.json

MODES:
  pdf2csv    PDF → <name>.csv with page,priority,content rows (default)
  trainvec   all CSV paragraphs → paragraph-vector model (--model)
  csv2vec    CSV paragraphs → vectors in <out>/output.h5, one dataset per CSV

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Overrides the log filter (e.g. sustain_preprocess=debug)
  PREPROCESS_*            Every flag, e.g. PREPROCESS_MODE=trainvec
"#;

/// Rank sustainability-report text blocks and embed them as paragraph vectors.
#[derive(Parser, Debug)]
#[command(
    name = "preprocess",
    version,
    about = "Rank PDF text blocks by density and build paragraph vectors",
    long_about = "Extract text blocks from a directory of sustainability-report PDFs, give each \
block a page-local priority from its area-per-character density, and write one CSV per report. \
The CSVs can then train a paragraph-vector model and be embedded into an HDF5 file.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input directory (PDFs for pdf2csv, CSVs otherwise).
    #[arg(short, long, env = "PREPROCESS_INPUT")]
    input: Option<PathBuf>,

    /// Output directory.
    #[arg(short, long, env = "PREPROCESS_OUTPUT", default_value = "out")]
    output: PathBuf,

    /// Mode: pdf2csv, csv2vec, trainvec.
    #[arg(short, long, env = "PREPROCESS_MODE", value_enum, default_value = "pdf2csv")]
    mode: ModeArg,

    /// Model file written by trainvec and read by csv2vec.
    #[arg(long, env = "PREPROCESS_MODEL", default_value = "model.bin")]
    model: PathBuf,

    /// PDF user password for encrypted reports.
    #[arg(long, env = "PREPROCESS_PASSWORD")]
    password: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PREPROCESS_PAGES", default_value = "all")]
    pages: String,

    /// Percentile convention for ties: weak, strict, mean, rank.
    #[arg(long, env = "PREPROCESS_PERCENTILE", value_enum, default_value = "weak")]
    percentile: PercentileArg,

    /// Max vertical gap between lines of a block, as a fraction of line height.
    #[arg(long, env = "PREPROCESS_LINE_MARGIN", default_value_t = 0.5)]
    line_margin: f32,

    /// Max horizontal gap between spans of a line, as a fraction of span height.
    #[arg(long, env = "PREPROCESS_CHAR_MARGIN", default_value_t = 2.0)]
    char_margin: f32,

    /// Paragraph-vector dimensionality.
    #[arg(long, env = "PREPROCESS_VECTOR_SIZE", default_value_t = 50)]
    vector_size: usize,

    /// Training (and inference) epochs.
    #[arg(long, env = "PREPROCESS_EPOCHS", default_value_t = 20)]
    epochs: usize,

    /// Initial learning rate.
    #[arg(long, env = "PREPROCESS_ALPHA", default_value_t = 0.0125)]
    alpha: f32,

    /// RNG seed for training and inference.
    #[arg(long, env = "PREPROCESS_SEED", default_value_t = 1)]
    seed: u64,

    /// Print BatchStats as JSON on stdout.
    #[arg(long, env = "PREPROCESS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PREPROCESS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PREPROCESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PREPROCESS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Pdf2csv,
    Csv2vec,
    Trainvec,
}

impl From<ModeArg> for Mode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Pdf2csv => Mode::Pdf2Csv,
            ModeArg::Csv2vec => Mode::Csv2Vec,
            ModeArg::Trainvec => Mode::TrainVec,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PercentileArg {
    Weak,
    Strict,
    Mean,
    Rank,
}

impl From<PercentileArg> for PercentileKind {
    fn from(v: PercentileArg) -> Self {
        match v {
            PercentileArg::Weak => PercentileKind::Weak,
            PercentileArg::Strict => PercentileKind::Strict,
            PercentileArg::Mean => PercentileKind::Mean,
            PercentileArg::Rank => PercentileKind::Rank,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mode: Mode = cli.mode.into();
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic(mode);
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let stats = batch::run(&config)
        .await
        .with_context(|| format!("{} failed", mode))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !cli.quiet {
        if !show_progress {
            for skipped in &stats.skipped {
                eprintln!("  {} {}", red("✗"), skipped.path().display());
            }
        }
        eprintln!(
            "{}  {}/{} files  {} items  {}ms",
            if stats.skipped.is_empty() {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.files_processed,
            stats.files_found,
            stats.items,
            stats.total_duration_ms,
        );
        for out in &stats.outputs {
            eprintln!("   →  {}", bold(&out.display().to_string()));
        }
        if stats.outputs.is_empty() {
            eprintln!("   {}", dim("nothing written"));
        }
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut extract = ExtractConfig::builder()
        .line_margin(cli.line_margin)
        .char_margin(cli.char_margin)
        .percentile(cli.percentile.into())
        .pages(pages);
    if let Some(ref pwd) = cli.password {
        extract = extract.password(pwd.clone());
    }
    let extract = extract.build().context("Invalid extraction settings")?;

    let vector = VectorConfig::builder()
        .vector_size(cli.vector_size)
        .epochs(cli.epochs)
        .alpha(cli.alpha)
        .seed(cli.seed)
        .build()
        .context("Invalid vector settings")?;

    let mut builder = BatchConfig::builder()
        .mode(cli.mode.into())
        .input_dir(cli.input.clone().unwrap_or_else(default_input_dir))
        .output_dir(&cli.output)
        .model_path(&cli.model)
        .extract(extract)
        .vector(vector);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_parse() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" 4 ").unwrap(), PageSelection::Single(4));
        assert_eq!(parse_pages("2-6").unwrap(), PageSelection::Range(2, 6));
        assert_eq!(
            parse_pages("1,3,5").unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("6-2").is_err());
        assert!(parse_pages("x").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["preprocess"]);
        assert_eq!(cli.output, PathBuf::from("out"));
        assert_eq!(cli.model, PathBuf::from("model.bin"));
        assert!(matches!(cli.mode, ModeArg::Pdf2csv));

        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.mode, Mode::Pdf2Csv);
        assert_eq!(config.input_dir, default_input_dir());
        assert_eq!(config.extract.percentile, PercentileKind::Weak);
    }

    #[test]
    fn cli_maps_vector_flags() {
        let cli = Cli::parse_from([
            "preprocess", "-m", "trainvec", "-i", "csv", "--model", "m.bin", "--vector-size", "16",
            "--epochs", "3", "--seed", "9",
        ]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.mode, Mode::TrainVec);
        assert_eq!(config.input_dir, PathBuf::from("csv"));
        assert_eq!(config.model_path, Some(PathBuf::from("m.bin")));
        assert_eq!(config.vector.vector_size, 16);
        assert_eq!(config.vector.epochs, 3);
        assert_eq!(config.vector.seed, 9);
    }
}
