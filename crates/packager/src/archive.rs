//! Request archive
//!
//! Bundles the icons and manifests of a request into a dated ZIP file.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::PackageError;

/// Archive file name prefix
pub const ARCHIVE_PREFIX: &str = "IconRequest";

/// One entry of a written archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
}

/// `IconRequest-YYYY.MM.DD.zip` for the given day
pub fn archive_name(date: NaiveDate) -> String {
    format!("{}-{}.zip", ARCHIVE_PREFIX, date.format("%Y.%m.%d"))
}

/// Zip `files` flat into `<dir>/IconRequest-YYYY.MM.DD.zip`.
///
/// Entries are named after the file names only. An existing archive for the
/// same day is replaced.
pub fn create_archive(dir: &Path, files: &[PathBuf], date: NaiveDate) -> Result<PathBuf, PackageError> {
    if files.is_empty() {
        return Err(PackageError::NothingToArchive);
    }

    let path = dir.join(archive_name(date));
    let file = File::create(&path).map_err(ZipError::from)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for source in files {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(ZipError::FileNotFound)?;
        let data = std::fs::read(source).map_err(ZipError::from)?;

        zip.start_file(name.as_str(), options)?;
        zip.write_all(&data).map_err(ZipError::from)?;
        debug!("Archived {} ({} bytes)", name, data.len());
    }

    zip.finish()?;
    info!("Created request archive {}", path.display());
    Ok(path)
}

/// List the entries of an archive
pub fn list_entries(path: &Path) -> Result<Vec<ArchiveEntry>, PackageError> {
    let file = File::open(path).map_err(ZipError::from)?;
    let mut archive = ZipArchive::new(file)?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        entries.push(ArchiveEntry {
            name: file.name().to_string(),
            size: file.size(),
            compressed_size: file.compressed_size(),
        });
    }

    Ok(entries)
}
