//! Input resolution: list the files a batch consumes and validate PDFs.
//!
//! pdfium crashes or reports opaque errors on files that are not PDFs, so
//! [`resolve_local`] checks the `%PDF` magic bytes first and maps filesystem
//! failures onto typed errors.

use crate::config::has_extension;
use crate::error::PreprocessError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// List regular files in `dir` whose extension is `ext`, sorted by path.
///
/// Non-recursive. The extension match ignores ASCII case.
pub fn discover(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, PreprocessError> {
    if !dir.is_dir() {
        return Err(PreprocessError::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => PreprocessError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => PreprocessError::InputDirNotFound {
            path: dir.to_path_buf(),
        },
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, ext))
        .collect();
    files.sort();

    debug!("Found {} .{} files in {}", files.len(), ext, dir.display());
    Ok(files)
}

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub fn resolve_local(path: &Path) -> Result<PathBuf, PreprocessError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(PreprocessError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic != b"%PDF" => {
                    return Err(PreprocessError::NotAPdf { path, magic });
                }
                Ok(()) => {}
                // Shorter than four bytes: whatever it is, it is not a PDF.
                Err(_) => {
                    return Err(PreprocessError::CorruptPdf {
                        path,
                        detail: "file is too short".to_string(),
                    });
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PreprocessError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(PreprocessError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Base name of `path` as a `String`, used as the `filename` of segments.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
