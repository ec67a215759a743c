//! CLI commands for iconrequest
//!
//! A run file (TOML) names the filter assets, the app inventory and the
//! request configuration; the commands drive an [`IconRequest`] from it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use iconrequest_appfilter::{AssetDir, DrawableDir, FilterParser, FilterSource};
use iconrequest_core::config::DEFAULT_FILTER_NAME;
use iconrequest_core::{
    App, Callbacks, DeviceInfo, LoadCallback, RequestConfig, RequestConfigBuilder, RequestError, SelectionListener,
    SendCallback,
};
use iconrequest_delivery::EmlDraftComposer;

use crate::inventory::InventoryFile;
use crate::orchestrator::{Collaborators, IconRequest};

/// Contents of a run file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFile {
    /// Directory holding the filter asset
    pub assets: PathBuf,
    /// Drawable resources checked during strict validation
    pub drawables: Option<PathBuf>,
    /// JSON app inventory
    pub inventory: PathBuf,
    /// Components to request; empty requests every unthemed app
    pub select: Vec<String>,
    /// Where email drafts go, next to the archive when unset
    pub drafts: Option<PathBuf>,
    pub device: Option<DeviceInfo>,
    pub request: RequestConfig,
}

impl Default for RunFile {
    fn default() -> Self {
        Self {
            assets: PathBuf::from("assets"),
            drawables: None,
            inventory: PathBuf::from("inventory.json"),
            select: Vec::new(),
            drafts: None,
            device: None,
            request: RequestConfig::default(),
        }
    }
}

impl RunFile {
    /// Load a run file, writing a default one when it does not exist
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading run file from {:?}", path);
            let content = tokio::fs::read_to_string(path).await?;
            Ok(toml::from_str(&content)?)
        } else {
            info!("Creating default run file at {:?}", path);
            let run = RunFile::default();
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, toml::to_string_pretty(&run)?).await?;
            Ok(run)
        }
    }

    fn resolve(base: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

/// Collects callback results for the command line
#[derive(Default)]
struct CliReporter {
    error: Mutex<Option<String>>,
    sent: AtomicBool,
}

impl CliReporter {
    fn fail(&self, error: &RequestError) {
        *self.error.lock() = Some(error.user_message());
    }

    fn check(&self) -> Result<()> {
        match self.error.lock().take() {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }
}

impl LoadCallback for CliReporter {
    fn on_loading_filter(&self) {
        info!("Reading the appfilter...");
    }

    fn on_load_progress(&self, percent: u8) {
        debug!("Scanning apps: {}%", percent);
    }

    fn on_apps_loaded(&self, apps: &[App]) {
        info!("{} apps are not themed yet", apps.len());
    }

    fn on_load_error(&self, error: &RequestError) {
        self.fail(error);
    }
}

impl SendCallback for CliReporter {
    fn on_request_preparing(&self) {
        info!("Preparing the request...");
    }

    fn on_request_error(&self, error: &RequestError) {
        self.fail(error);
    }

    fn on_request_sent(&self) {
        self.sent.store(true, Ordering::SeqCst);
    }
}

impl SelectionListener for CliReporter {
    fn on_selection_changed(&self, selected: usize) {
        debug!("{} apps selected", selected);
    }
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub unthemed: usize,
    pub selected: usize,
    pub sent: bool,
}

/// Load, select and send a request as described by a run file
pub struct RunCommand {
    pub run_file: PathBuf,
}

impl RunCommand {
    /// Execute the run command
    pub async fn execute(&self) -> Result<RunSummary> {
        let run = RunFile::load_or_create(&self.run_file).await?;
        let base = self.run_file.parent().map(Path::to_path_buf).unwrap_or_default();

        let inventory = Arc::new(InventoryFile::load(&RunFile::resolve(&base, &run.inventory))?);
        let mut collaborators = Collaborators::new(
            Arc::new(AssetDir::new(RunFile::resolve(&base, &run.assets))),
            inventory.clone(),
            inventory,
        );
        if let Some(dir) = &run.drawables {
            collaborators = collaborators.with_resources(Arc::new(DrawableDir::new(RunFile::resolve(&base, dir))));
        }
        if let Some(dir) = &run.drafts {
            let composer = EmlDraftComposer::new().with_out_dir(RunFile::resolve(&base, dir));
            collaborators = collaborators.with_email(Arc::new(composer));
        }
        if let Some(device) = &run.device {
            collaborators = collaborators.with_device(device.clone());
        }

        let config = RequestConfigBuilder::from(run.request.clone()).build();
        let reporter = Arc::new(CliReporter::default());
        let mut request = IconRequest::new(config, collaborators);
        request.attach_callbacks(
            Callbacks::new()
                .with_load(reporter.clone())
                .with_send(reporter.clone())
                .with_selection(reporter.clone()),
        );

        request.load_apps()?;
        request.wait().await;
        reporter.check()?;

        let apps = request.apps().unwrap_or_default();
        if run.select.is_empty() {
            request.select_all();
        } else {
            for component in &run.select {
                match apps.iter().find(|app| app.component() == component) {
                    Some(app) => {
                        request.select(app);
                    }
                    None => warn!("{} is not an unthemed app, skipping", component),
                }
            }
        }

        request.send()?;
        request.wait().await;
        reporter.check()?;

        let summary = RunSummary {
            unthemed: apps.len(),
            selected: request.selected().len(),
            sent: reporter.sent.load(Ordering::SeqCst),
        };
        request.cleanup();
        Ok(summary)
    }
}

/// Result of checking a filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCheck {
    pub themed: usize,
    pub diagnostics: Vec<String>,
}

/// Validate the filter named by a run file without sending anything
pub struct CheckCommand {
    pub run_file: PathBuf,
}

impl CheckCommand {
    /// Execute the check command
    pub async fn execute(&self) -> Result<FilterCheck> {
        let run = RunFile::load_or_create(&self.run_file).await?;
        let base = self.run_file.parent().map(Path::to_path_buf).unwrap_or_default();

        let name = run.request.filter().unwrap_or(DEFAULT_FILTER_NAME).to_string();
        let assets = AssetDir::new(RunFile::resolve(&base, &run.assets));
        let mut parser = FilterParser::new(true);
        if let Some(dir) = &run.drawables {
            parser = parser.with_resources(Arc::new(DrawableDir::new(RunFile::resolve(&base, dir))));
        }

        let parsed = tokio::task::spawn_blocking(move || -> Result<_> {
            let reader = assets.open(&name).map_err(|source| RequestError::FilterOpen {
                name: name.clone(),
                source,
            })?;
            Ok(parser.parse_reader(&name, reader)?)
        })
        .await??;

        info!("{} components themed, {} problems", parsed.themed.len(), parsed.report.len());
        Ok(FilterCheck {
            themed: parsed.themed.len(),
            diagnostics: parsed.report.diagnostics().to_vec(),
        })
    }
}
