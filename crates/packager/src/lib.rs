//! Icon Request Packager
//!
//! Turns a selection into files: PNG icons, the markup and JSON manifests,
//! the HTML message body and the dated ZIP archive.

pub mod archive;
pub mod body;
pub mod drawable;
pub mod icons;
pub mod manifest;
pub mod runner;
pub mod workdir;

pub use archive::{archive_name, create_archive, list_entries, ArchiveEntry};
pub use body::build_body;
pub use drawable::drawable_name;
pub use icons::{save_icon, save_icons};
pub use manifest::{ManifestFormats, RequestManifest};
pub use runner::{PackageStage, PackagedRequest, RequestPackager};
pub use workdir::{ensure_dir, remove_loose_files};

use std::path::PathBuf;

use iconrequest_core::RequestError;

/// Packaging errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Unable to create folders: {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to save an icon for {package}: {source}")]
    IconSave {
        package: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to write your request {file} file: {source}")]
    ManifestWrite {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to render the {format} manifest: {message}")]
    Render { format: &'static str, message: String },
    #[error("There are no files to put into the ZIP archive.")]
    NothingToArchive,
    #[error("Failed to create the request ZIP file: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PackageError> for RequestError {
    fn from(err: PackageError) -> Self {
        match err {
            PackageError::WorkDir { path, source } => RequestError::Io(std::io::Error::new(
                source.kind(),
                format!("Unable to create folders: {}: {}", path.display(), source),
            )),
            PackageError::IconSave { package, source } => RequestError::IconSave {
                package,
                message: source.to_string(),
            },
            PackageError::ManifestWrite { file, source } => RequestError::ManifestWrite { file, source },
            PackageError::Render { format, message } => RequestError::ManifestWrite {
                file: format.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, message),
            },
            PackageError::NothingToArchive => RequestError::NothingToArchive,
            PackageError::Archive(e) => RequestError::Archive(e.to_string()),
            PackageError::Io(e) => RequestError::Io(e),
        }
    }
}
