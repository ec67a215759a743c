//! Installed application records
//!
//! An [`App`] identifies one launchable entry by its component identifier
//! (`package/activity`). Icons are resolved lazily through an [`IconSource`]
//! and cached on the record.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::filter::ThemedComponentSet;

/// Icon image returned by an [`IconSource`]
#[derive(Debug, Clone)]
pub enum IconImage {
    /// Decoded RGBA bitmap
    Bitmap(image::RgbaImage),
    /// Any non-bitmap icon (adaptive, vector...). Skipped when saving.
    Unsupported(String),
}

impl IconImage {
    /// Get the bitmap, if this icon is one
    pub fn as_bitmap(&self) -> Option<&image::RgbaImage> {
        match self {
            IconImage::Bitmap(bitmap) => Some(bitmap),
            IconImage::Unsupported(_) => None,
        }
    }
}

/// One installed application
#[derive(Clone, Serialize, Deserialize)]
pub struct App {
    name: String,
    package: String,
    component: String,
    #[serde(skip)]
    icon: Arc<OnceCell<Option<IconImage>>>,
}

impl App {
    /// Create a new app record
    pub fn new(name: impl Into<String>, package: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            component: component.into(),
            icon: Arc::default(),
        }
    }

    /// Create an app record, taking the package from the component identifier
    pub fn from_component(name: impl Into<String>, component: impl Into<String>) -> Self {
        let component = component.into();
        let package = component
            .split_once('/')
            .map(|(pkg, _)| pkg.to_string())
            .unwrap_or_else(|| component.clone());
        Self::new(name, package, component)
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package identifier
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Component identifier (`package/activity`)
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Activity part of the component identifier
    pub fn activity(&self) -> Option<&str> {
        self.component.split_once('/').map(|(_, activity)| activity)
    }

    /// Resolve the icon, caching the first lookup
    pub fn icon(&self, source: &dyn IconSource) -> Option<&IconImage> {
        self.icon.get_or_init(|| source.load_icon(self)).as_ref()
    }
}

impl PartialEq for App {
    fn eq(&self, other: &Self) -> bool {
        self.component == other.component
    }
}

impl Eq for App {}

impl Hash for App {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.component.hash(state);
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("package", &self.package)
            .field("component", &self.component)
            .field("icon_cached", &self.icon.get().is_some())
            .finish()
    }
}

/// Resolves icons for apps
pub trait IconSource: Send + Sync {
    /// Load the icon for an app, `None` when it has none
    fn load_icon(&self, app: &App) -> Option<IconImage>;
}

/// Receives enumeration progress as a percentage
pub trait ProgressSink {
    fn report(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8),
{
    fn report(&self, percent: u8) {
        self(percent)
    }
}

/// Enumerates installed apps
pub trait AppSource: Send + Sync {
    /// Return every launchable app whose component is not in `themed`.
    ///
    /// Failures for individual packages are the source's concern and must
    /// not abort the enumeration.
    fn unthemed_apps(&self, themed: &ThemedComponentSet, progress: &dyn ProgressSink) -> Vec<App>;
}
