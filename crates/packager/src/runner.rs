//! Packaging runner
//!
//! Runs the blocking part of a send cycle: icons, manifests, archive and
//! cleanup, reporting each stage as it starts.

use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{debug, info};

use iconrequest_core::{App, DeviceInfo, IconSource, RequestConfig};

use crate::archive::create_archive;
use crate::body::build_body;
use crate::icons::save_icons;
use crate::manifest::{ManifestFormats, RequestManifest};
use crate::workdir::{ensure_dir, remove_loose_files};
use crate::PackageError;

/// Packaging progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStage {
    SavingIcons,
    WritingManifests,
    Archiving,
    CleaningUp,
}

/// Result of a successful packaging run
#[derive(Debug, Clone)]
pub struct PackagedRequest {
    /// Path to the dated ZIP archive
    pub archive: PathBuf,
    pub manifest: RequestManifest,
    /// HTML message body
    pub body: String,
}

/// Packages a selection according to a request configuration
#[derive(Debug, Clone)]
pub struct RequestPackager {
    config: RequestConfig,
    device: DeviceInfo,
}

impl RequestPackager {
    pub fn new(config: RequestConfig, device: DeviceInfo) -> Self {
        Self { config, device }
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Package `apps` into the working directory
    pub fn package(&self, apps: &[App], icons: &dyn IconSource, date: NaiveDate) -> Result<PackagedRequest, PackageError> {
        self.package_with_progress(apps, icons, date, |_| {})
    }

    /// Package `apps`, calling `on_stage` as each stage begins
    pub fn package_with_progress<F>(
        &self,
        apps: &[App],
        icons: &dyn IconSource,
        date: NaiveDate,
        on_stage: F,
    ) -> Result<PackagedRequest, PackageError>
    where
        F: Fn(PackageStage),
    {
        let dir = &self.config.save_dir;
        ensure_dir(dir)?;

        on_stage(PackageStage::SavingIcons);
        let mut files = save_icons(dir, apps, icons)?;
        debug!("Saved {} icons", files.len());

        on_stage(PackageStage::WritingManifests);
        let written = RequestManifest::build(apps, ManifestFormats::from(&self.config))
            .and_then(|manifest| {
                let paths = manifest.write_files(dir, !self.config.is_remote())?;
                Ok((manifest, paths))
            });
        let manifest = match written {
            Ok((manifest, paths)) => {
                files.extend(paths);
                manifest
            }
            Err(e) => {
                remove_loose_files(&files);
                return Err(e);
            }
        };

        on_stage(PackageStage::Archiving);
        let archived = create_archive(dir, &files, date);

        // Loose files go whether or not the archive was written.
        on_stage(PackageStage::CleaningUp);
        remove_loose_files(&files);

        let archive = archived?;
        info!("Packaged {} apps into {}", apps.len(), archive.display());

        Ok(PackagedRequest {
            archive,
            manifest,
            body: build_body(&self.config, apps, &self.device),
        })
    }
}
