//! HDF5 store for inferred paragraph vectors.
//!
//! `output.h5` holds one `f32` dataset per input CSV, named after the CSV
//! (`report.csv`), with shape `(paragraphs, vector_size)`.
//!
//! The HDF5 functions need the `h5` feature (on by default). Without it they
//! return [`PreprocessError::FeatureDisabled`].

use crate::error::PreprocessError;
use serde::{Deserialize, Serialize};
#[cfg(feature = "h5")]
use std::path::Path;
use std::path::PathBuf;
#[cfg(feature = "h5")]
use tracing::{debug, info, warn};

/// A row-major `rows × dim` block of vectors with its dataset name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSet {
    pub name: String,
    pub rows: usize,
    pub dim: usize,
    pub data: Vec<f32>,
}

impl VectorSet {
    /// Collect per-paragraph vectors into one set. All rows must have `dim` entries.
    pub fn from_rows(
        name: impl Into<String>,
        dim: usize,
        rows: Vec<Vec<f32>>,
    ) -> Result<Self, PreprocessError> {
        let name = name.into();
        let n = rows.len();
        let mut data = Vec::with_capacity(n * dim);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dim {
                return Err(PreprocessError::VectorStore {
                    path: PathBuf::from(&name),
                    detail: format!("row {} has {} values, expected {}", i, row.len(), dim),
                });
            }
            data.extend(row);
        }
        Ok(VectorSet {
            name,
            rows: n,
            dim,
            data,
        })
    }

    /// The `i`-th vector.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        self.data.get(i * self.dim..(i + 1) * self.dim)
    }
}

/// Stack every set row-wise into one matrix named `stacked`.
///
/// All sets must share a dimension. An empty input yields an empty matrix.
pub fn stack_vectors(sets: &[VectorSet]) -> Result<VectorSet, PreprocessError> {
    let dim = sets.first().map(|s| s.dim).unwrap_or(0);
    let mut data = Vec::with_capacity(sets.iter().map(|s| s.data.len()).sum());
    let mut rows = 0;
    for set in sets {
        if set.dim != dim {
            return Err(PreprocessError::VectorStore {
                path: PathBuf::from(&set.name),
                detail: format!("dimension {} does not match {}", set.dim, dim),
            });
        }
        rows += set.rows;
        data.extend_from_slice(&set.data);
    }
    Ok(VectorSet {
        name: "stacked".into(),
        rows,
        dim,
        data,
    })
}

#[cfg(feature = "h5")]
fn store_err(path: &Path, e: impl std::fmt::Display) -> PreprocessError {
    PreprocessError::VectorStore {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// Write `sets` to a new HDF5 file at `path`, one dataset per set.
///
/// Sets without rows are skipped with a warning. Returns the number of
/// datasets written.
#[cfg(feature = "h5")]
pub fn write_vectors(path: &Path, sets: &[VectorSet]) -> Result<usize, PreprocessError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PreprocessError::OutputWriteFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let file = hdf5::File::create(path).map_err(|e| store_err(path, e))?;
    let mut written = 0;
    for set in sets {
        if set.rows == 0 {
            warn!("{}: no paragraphs, dataset skipped", set.name);
            continue;
        }
        let ds = file
            .new_dataset::<f32>()
            .shape([set.rows, set.dim])
            .create(set.name.as_str())
            .map_err(|e| store_err(path, e))?;
        ds.write_raw(&set.data).map_err(|e| store_err(path, e))?;
        debug!("{}: wrote {}x{} vectors", set.name, set.rows, set.dim);
        written += 1;
    }

    info!("Wrote {} datasets to {}", written, path.display());
    Ok(written)
}

/// Read every dataset of an HDF5 vector file, sorted by name.
#[cfg(feature = "h5")]
pub fn load_vectors(path: &Path) -> Result<Vec<VectorSet>, PreprocessError> {
    let file = hdf5::File::open(path).map_err(|e| store_err(path, e))?;
    let mut names = file.member_names().map_err(|e| store_err(path, e))?;
    names.sort();

    let mut sets = Vec::with_capacity(names.len());
    for name in names {
        let ds = file.dataset(&name).map_err(|e| store_err(path, e))?;
        let shape = ds.shape();
        let (rows, dim) = match shape.as_slice() {
            [rows, dim] => (*rows, *dim),
            other => {
                return Err(store_err(
                    path,
                    format!("dataset '{}' has shape {:?}, expected 2-D", name, other),
                ))
            }
        };
        let data = ds.read_raw::<f32>().map_err(|e| store_err(path, e))?;
        sets.push(VectorSet {
            name,
            rows,
            dim,
            data,
        });
    }
    Ok(sets)
}

#[cfg(not(feature = "h5"))]
pub fn write_vectors(
    _path: &std::path::Path,
    _sets: &[VectorSet],
) -> Result<usize, PreprocessError> {
    Err(PreprocessError::FeatureDisabled {
        operation: "write_vectors",
        feature: "h5",
    })
}

#[cfg(not(feature = "h5"))]
pub fn load_vectors(_path: &std::path::Path) -> Result<Vec<VectorSet>, PreprocessError> {
    Err(PreprocessError::FeatureDisabled {
        operation: "load_vectors",
        feature: "h5",
    })
}
