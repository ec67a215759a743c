//! Working directory housekeeping

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::PackageError;

/// Extensions of the loose files a request leaves behind
const LOOSE_EXTENSIONS: &[&str] = &["png", "xml", "json"];

/// Create the working directory and its parents
pub fn ensure_dir(dir: &Path) -> Result<(), PackageError> {
    fs::create_dir_all(dir).map_err(|source| PackageError::WorkDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Delete the given loose working files. Never fails; returns how many went.
pub fn remove_loose_files(files: &[PathBuf]) -> usize {
    let mut removed = 0;
    for file in files {
        let loose = file
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| LOOSE_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if !loose {
            continue;
        }
        match fs::remove_file(file) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Could not delete {}: {}", file.display(), e),
        }
    }
    debug!("Removed {} working files", removed);
    removed
}
