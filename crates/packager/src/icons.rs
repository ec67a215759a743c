//! Saving app icons as PNG files

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use tracing::debug;

use iconrequest_core::{App, IconImage, IconSource};

use crate::workdir::remove_loose_files;
use crate::PackageError;

/// Write one bitmap to `<dir>/<package>.png`
pub fn save_icon(dir: &Path, app: &App, bitmap: &RgbaImage) -> Result<PathBuf, PackageError> {
    let path = dir.join(format!("{}.png", app.package()));
    bitmap
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|source| PackageError::IconSave {
            package: app.package().to_string(),
            source,
        })?;
    Ok(path)
}

/// Save the icon of every app in order.
///
/// Apps without an icon or with a non-bitmap icon are skipped. The first
/// write failure aborts and removes the icons already written. Apps sharing
/// a package share one file.
pub fn save_icons(dir: &Path, apps: &[App], source: &dyn IconSource) -> Result<Vec<PathBuf>, PackageError> {
    let mut saved: Vec<PathBuf> = Vec::new();

    for app in apps {
        match app.icon(source) {
            Some(IconImage::Bitmap(bitmap)) => {
                let path = match save_icon(dir, app, bitmap) {
                    Ok(path) => path,
                    Err(e) => {
                        remove_loose_files(&saved);
                        return Err(e);
                    }
                };
                if !saved.contains(&path) {
                    saved.push(path);
                }
            }
            Some(IconImage::Unsupported(kind)) => {
                debug!("Skipping {} icon for {}", kind, app.package());
            }
            None => debug!("No icon for {}", app.package()),
        }
    }

    Ok(saved)
}
