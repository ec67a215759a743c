//! Drawable resource lookup used for strict filter validation

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;

/// Answers whether a drawable resource exists
pub trait ResourceResolver: Send + Sync {
    /// Look up a drawable by name. An error counts as "no match".
    fn has_drawable(&self, name: &str) -> io::Result<bool>;
}

/// Extensions a drawable resource file may carry
const DRAWABLE_EXTENSIONS: &[&str] = &["png", "webp", "jpg", "xml"];

/// Drawables stored as files in a resource directory
#[derive(Debug, Clone)]
pub struct DrawableDir {
    root: PathBuf,
}

impl DrawableDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceResolver for DrawableDir {
    fn has_drawable(&self, name: &str) -> io::Result<bool> {
        for ext in DRAWABLE_EXTENSIONS {
            if self.root.join(format!("{}.{}", name, ext)).try_exists()? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Fixed set of known drawable names
#[derive(Debug, Clone, Default)]
pub struct DrawableSet {
    names: HashSet<String>,
}

impl DrawableSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl ResourceResolver for DrawableSet {
    fn has_drawable(&self, name: &str) -> io::Result<bool> {
        Ok(self.names.contains(name))
    }
}
