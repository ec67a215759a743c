//! App inventory files
//!
//! Stand-in for a device's package manager: a JSON list of launchable apps
//! with the path of each app's icon.
//!
//! ```json
//! {
//!     "apps": [
//!         { "name": "Maps", "component": "com.maps/com.maps.Main", "icon": "icons/maps.png" }
//!     ]
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use iconrequest_core::{App, AppSource, IconImage, IconSource, ProgressSink, RequestError, Result, ThemedComponentSet};

/// One inventory record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub name: String,
    /// `package/activity`
    pub component: String,
    /// Defaults to the part of the component before `/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Icon path, relative to the inventory file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
}

impl InventoryEntry {
    fn to_app(&self) -> App {
        match &self.package {
            Some(package) => App::new(&self.name, package, &self.component),
            None => App::from_component(&self.name, &self.component),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct InventoryDocument {
    #[serde(default)]
    apps: Vec<InventoryEntry>,
}

/// Apps and icons read from an inventory file
#[derive(Debug, Clone, Default)]
pub struct InventoryFile {
    base_dir: PathBuf,
    entries: Vec<InventoryEntry>,
    icons: HashMap<String, PathBuf>,
}

impl InventoryFile {
    /// Read an inventory from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let inventory = Self::from_json(&content, base_dir)?;
        info!("Loaded {} inventory entries from {:?}", inventory.len(), path);
        Ok(inventory)
    }

    /// Parse an inventory, resolving icon paths against `base_dir`
    pub fn from_json(json: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let document: InventoryDocument = serde_json::from_str(json)?;
        Ok(Self::from_entries(document.apps, base_dir))
    }

    pub fn from_entries(entries: Vec<InventoryEntry>, base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let icons = entries
            .iter()
            .filter_map(|entry| {
                let icon = entry.icon.as_ref()?;
                Some((entry.component.clone(), base_dir.join(icon)))
            })
            .collect();
        Self {
            base_dir,
            entries,
            icons,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Find the app for a component identifier
    pub fn find(&self, component: &str) -> Option<App> {
        self.entries
            .iter()
            .find(|entry| entry.component == component)
            .map(InventoryEntry::to_app)
    }
}

impl AppSource for InventoryFile {
    fn unthemed_apps(&self, themed: &ThemedComponentSet, progress: &dyn ProgressSink) -> Vec<App> {
        let total = self.entries.len().max(1);
        let mut apps = Vec::new();

        for (i, entry) in self.entries.iter().enumerate() {
            if themed.contains(&entry.component) {
                debug!("{} is already themed", entry.component);
            } else {
                apps.push(entry.to_app());
            }
            progress.report(((i + 1) * 100 / total) as u8);
        }

        apps
    }
}

impl IconSource for InventoryFile {
    fn load_icon(&self, app: &App) -> Option<IconImage> {
        let path = self.icons.get(app.component())?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if extension == "xml" {
            return Some(IconImage::Unsupported("vector".to_string()));
        }

        match image::open(path) {
            Ok(icon) => Some(IconImage::Bitmap(icon.to_rgba8())),
            Err(e) => {
                warn!("Could not read icon {:?} for {}: {}", path, app.component(), e);
                None
            }
        }
    }
}

/// Write an inventory file
pub fn save_inventory(path: &Path, entries: &[InventoryEntry]) -> Result<()> {
    let document = InventoryDocument {
        apps: entries.to_vec(),
    };
    let content = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, content).map_err(RequestError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    const INVENTORY: &str = r#"{
        "apps": [
            { "name": "Maps", "component": "com.maps/com.maps.Main", "icon": "icons/maps.png" },
            { "name": "Clock", "component": "com.clock/com.clock.Main", "package": "com.clock", "icon": "icons/clock.xml" },
            { "name": "Notes", "component": "com.notes/com.notes.Main" }
        ]
    }"#;

    #[test]
    fn test_unthemed_apps_with_progress() {
        let inventory = InventoryFile::from_json(INVENTORY, "/pack").unwrap();
        let themed: ThemedComponentSet = ["com.clock/com.clock.Main".to_string()].into_iter().collect();
        let reported = Mutex::new(Vec::new());

        let apps = inventory.unthemed_apps(&themed, &|percent: u8| reported.lock().push(percent));
        let packages: Vec<_> = apps.iter().map(|a| a.package().to_string()).collect();
        assert_eq!(packages, vec!["com.maps", "com.notes"]);
        assert_eq!(*reported.lock(), vec![33, 66, 100]);
    }

    #[test]
    fn test_load_icons() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("icons")).unwrap();
        image::RgbaImage::new(3, 3).save(tmp.path().join("icons/maps.png")).unwrap();
        std::fs::write(tmp.path().join("icons/clock.xml"), "<adaptive-icon/>").unwrap();
        let path = tmp.path().join("inventory.json");
        std::fs::write(&path, INVENTORY).unwrap();

        let inventory = InventoryFile::load(&path).unwrap();
        let maps = inventory.find("com.maps/com.maps.Main").unwrap();
        let clock = inventory.find("com.clock/com.clock.Main").unwrap();
        let notes = inventory.find("com.notes/com.notes.Main").unwrap();

        assert!(matches!(inventory.load_icon(&maps), Some(IconImage::Bitmap(ref b)) if b.width() == 3));
        assert!(matches!(inventory.load_icon(&clock), Some(IconImage::Unsupported(_))));
        assert!(inventory.load_icon(&notes).is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("inventory.json");
        let entries = InventoryFile::from_json(INVENTORY, tmp.path()).unwrap().entries().to_vec();

        save_inventory(&path, &entries).unwrap();
        assert_eq!(InventoryFile::load(&path).unwrap().entries(), entries.as_slice());
    }

    #[test]
    fn test_invalid_inventory() {
        let err = InventoryFile::from_json("{ nope", "/").unwrap_err();
        assert!(matches!(err, RequestError::Json(_)));
    }
}
