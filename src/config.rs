//! Configuration types for extraction, vectorisation, and batch runs.
//!
//! Every knob lives in one of three structs:
//!
//! * [`ExtractConfig`] — how a PDF is segmented into blocks and ranked.
//! * [`VectorConfig`]  — paragraph-vector hyper-parameters.
//! * [`BatchConfig`]   — which mode runs over which directories, plus the two
//!   configs above.
//!
//! All three are built through builders so callers set only what they care
//! about and rely on documented defaults for the rest.

use crate::error::PreprocessError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ── Extraction ───────────────────────────────────────────────────────────

/// Configuration for turning one PDF into ranked segments.
///
/// # Example
/// ```rust
/// use sustain_preprocess::{ExtractConfig, PercentileKind};
///
/// let config = ExtractConfig::builder()
///     .line_margin(0.4)
///     .percentile(PercentileKind::Rank)
///     .build()
///     .unwrap();
/// assert_eq!(config.line_margin, 0.4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Maximum vertical gap between two lines of the same block, as a
    /// fraction of the taller line's height. Default: 0.5.
    pub line_margin: f32,

    /// Maximum horizontal gap between two runs of the same line, as a
    /// multiple of the line height. Default: 2.0.
    pub char_margin: f32,

    /// Lines whose heights differ by more than this factor never share a
    /// block, so a heading is not swallowed by the paragraph under it.
    /// Default: 1.3.
    pub max_height_ratio: f32,

    /// Tie convention used when ranking densities. Default: [`PercentileKind::Weak`].
    pub percentile: PercentileKind,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted reports.
    pub password: Option<String>,

    /// Explicit pdfium library (file or directory). Falls back to
    /// `PDFIUM_LIB_PATH`, the working directory, then the system library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            line_margin: 0.5,
            char_margin: 2.0,
            max_height_ratio: 1.3,
            percentile: PercentileKind::default(),
            pages: PageSelection::default(),
            password: None,
            pdfium_lib_path: None,
        }
    }
}

impl ExtractConfig {
    /// Create a new builder for `ExtractConfig`.
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractConfig`].
#[derive(Debug)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn line_margin(mut self, margin: f32) -> Self {
        self.config.line_margin = margin;
        self
    }

    pub fn char_margin(mut self, margin: f32) -> Self {
        self.config.char_margin = margin;
        self
    }

    pub fn max_height_ratio(mut self, ratio: f32) -> Self {
        self.config.max_height_ratio = ratio;
        self
    }

    pub fn percentile(mut self, kind: PercentileKind) -> Self {
        self.config.percentile = kind;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractConfig, PreprocessError> {
        let c = &self.config;
        if !(c.line_margin.is_finite() && c.line_margin >= 0.0) {
            return Err(PreprocessError::InvalidConfig(format!(
                "line margin must be a non-negative number, got {}",
                c.line_margin
            )));
        }
        if !(c.char_margin.is_finite() && c.char_margin >= 0.0) {
            return Err(PreprocessError::InvalidConfig(format!(
                "char margin must be a non-negative number, got {}",
                c.char_margin
            )));
        }
        if !(c.max_height_ratio.is_finite() && c.max_height_ratio >= 1.0) {
            return Err(PreprocessError::InvalidConfig(format!(
                "max height ratio must be ≥ 1, got {}",
                c.max_height_ratio
            )));
        }
        Ok(self.config)
    }
}

// ── Vectorisation ────────────────────────────────────────────────────────

/// Hyper-parameters of the paragraph-vector model.
///
/// Defaults follow the values the sustainability pipeline has always used:
/// 50 dimensions, learning rate 0.0125, every word kept, 20 epochs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Dimensionality of paragraph vectors. Default: 50.
    pub vector_size: usize,
    /// Initial learning rate. Default: 0.0125.
    pub alpha: f32,
    /// Learning rate reached on the last epoch. Default: 0.0001.
    pub min_alpha: f32,
    /// Words seen fewer times than this are dropped. Default: 1.
    pub min_count: usize,
    /// Passes over the corpus (also used for inference). Default: 20.
    pub epochs: usize,
    /// Negative samples per positive word. Default: 5.
    pub negative: usize,
    /// RNG seed; training and inference are deterministic for a given seed.
    pub seed: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            vector_size: 50,
            alpha: 0.0125,
            min_alpha: 0.0001,
            min_count: 1,
            epochs: 20,
            negative: 5,
            seed: 1,
        }
    }
}

impl VectorConfig {
    /// Create a new builder for `VectorConfig`.
    pub fn builder() -> VectorConfigBuilder {
        VectorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`VectorConfig`].
#[derive(Debug)]
pub struct VectorConfigBuilder {
    config: VectorConfig,
}

impl VectorConfigBuilder {
    pub fn vector_size(mut self, n: usize) -> Self {
        self.config.vector_size = n;
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.config.alpha = alpha;
        self
    }

    pub fn min_alpha(mut self, alpha: f32) -> Self {
        self.config.min_alpha = alpha;
        self
    }

    pub fn min_count(mut self, n: usize) -> Self {
        self.config.min_count = n.max(1);
        self
    }

    pub fn epochs(mut self, n: usize) -> Self {
        self.config.epochs = n;
        self
    }

    pub fn negative(mut self, n: usize) -> Self {
        self.config.negative = n;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VectorConfig, PreprocessError> {
        let c = &self.config;
        if c.vector_size == 0 {
            return Err(PreprocessError::InvalidConfig(
                "vector size must be ≥ 1".into(),
            ));
        }
        if c.epochs == 0 {
            return Err(PreprocessError::InvalidConfig("epochs must be ≥ 1".into()));
        }
        if c.negative == 0 {
            return Err(PreprocessError::InvalidConfig(
                "negative samples must be ≥ 1".into(),
            ));
        }
        if !(c.alpha > 0.0 && c.alpha.is_finite())
            || !(c.min_alpha >= 0.0 && c.min_alpha <= c.alpha)
        {
            return Err(PreprocessError::InvalidConfig(format!(
                "learning rate must satisfy 0 ≤ min_alpha ≤ alpha, got {} / {}",
                c.min_alpha, c.alpha
            )));
        }
        Ok(self.config)
    }
}

// ── Batch ────────────────────────────────────────────────────────────────

/// What a batch run does with its input directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// PDF → CSV of ranked segments. (default)
    #[default]
    Pdf2Csv,
    /// CSV → HDF5 paragraph vectors, using a trained model.
    Csv2Vec,
    /// CSV corpus → trained paragraph-vector model.
    TrainVec,
}

impl Mode {
    /// File extension of the inputs this mode consumes.
    pub fn extension(self) -> &'static str {
        match self {
            Mode::Pdf2Csv => "pdf",
            Mode::Csv2Vec | Mode::TrainVec => "csv",
        }
    }

    /// Whether the mode reads or writes a model file.
    pub fn needs_model(self) -> bool {
        !matches!(self, Mode::Pdf2Csv)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Pdf2Csv => "pdf2csv",
            Mode::Csv2Vec => "csv2vec",
            Mode::TrainVec => "trainvec",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a directory-level run.
///
/// ```rust
/// use sustain_preprocess::{BatchConfig, Mode};
///
/// let err = BatchConfig::builder()
///     .mode(Mode::TrainVec)
///     .model_path("")
///     .build()
///     .unwrap_err();
/// assert!(err.to_string().contains("--model"));
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    pub mode: Mode,
    /// Directory scanned (non-recursively) for inputs.
    pub input_dir: PathBuf,
    /// Directory receiving CSVs or `output.h5`. Created if missing.
    pub output_dir: PathBuf,
    /// Model file written by `trainvec` and read by `csv2vec`.
    pub model_path: Option<PathBuf>,
    pub extract: ExtractConfig,
    pub vector: VectorConfig,
    /// Per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            input_dir: default_input_dir(),
            output_dir: PathBuf::from("out"),
            model_path: Some(PathBuf::from("model.bin")),
            extract: ExtractConfig::default(),
            vector: VectorConfig::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("mode", &self.mode)
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("model_path", &self.model_path)
            .field("extract", &self.extract)
            .field("vector", &self.vector)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Path of the HDF5 file written by `csv2vec`.
    pub fn vectors_path(&self) -> PathBuf {
        self.output_dir.join("output.h5")
    }
}

/// `~/data/sustain/all/`, where the report collection is usually synced.
pub fn default_input_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join("data").join("sustain").join("all"))
        .unwrap_or_else(|| PathBuf::from("data/sustain/all"))
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    pub fn no_model_path(mut self) -> Self {
        self.config.model_path = None;
        self
    }

    pub fn extract(mut self, extract: ExtractConfig) -> Self {
        self.config.extract = extract;
        self
    }

    pub fn vector(mut self, vector: VectorConfig) -> Self {
        self.config.vector = vector;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Fails fast when a vector mode has no usable model path, before any
    /// input is touched.
    pub fn build(self) -> Result<BatchConfig, PreprocessError> {
        let c = &self.config;
        if c.mode.needs_model() {
            let missing = c
                .model_path
                .as_deref()
                .map(|p| p.as_os_str().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(PreprocessError::MissingModelPath {
                    mode: c.mode.to_string(),
                    role: if c.mode == Mode::TrainVec {
                        "output"
                    } else {
                        "input"
                    },
                });
            }
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(PreprocessError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How ties are treated when turning a density into a percentile.
///
/// The four conventions of `scipy.stats.percentileofscore`:
///
/// | Kind | Percentile of `x` in `a` |
/// |------|--------------------------|
/// | `Weak` | share of values `<= x` (default) |
/// | `Strict` | share of values `< x` |
/// | `Mean` | average of `Weak` and `Strict` |
/// | `Rank` | average rank of the tied values |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentileKind {
    #[default]
    Weak,
    Strict,
    Mean,
    Rank,
}

/// Specifies which pages of the PDF to rank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Rank all pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Resolve the pdfium library location: explicit config, then `PDFIUM_LIB_PATH`.
pub(crate) fn pdfium_lib_override(config: &ExtractConfig) -> Option<PathBuf> {
    config
        .pdfium_lib_path
        .clone()
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty())
}

/// `true` when `path` has `ext` as its extension (ASCII case-insensitive).
pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}
