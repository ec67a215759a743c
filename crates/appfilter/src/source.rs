//! Filter sources
//!
//! Where named filter definitions are opened from.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::PathBuf;

/// Opens named filter assets
pub trait FilterSource: Send + Sync {
    fn open(&self, name: &str) -> io::Result<Box<dyn BufRead + Send>>;
}

/// Filters stored as files in an asset directory
#[derive(Debug, Clone)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl FilterSource for AssetDir {
    fn open(&self, name: &str) -> io::Result<Box<dyn BufRead + Send>> {
        let file = File::open(self.root.join(name))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Filter text held in memory under a single name
#[derive(Debug, Clone)]
pub struct InlineFilter {
    name: String,
    text: String,
}

impl InlineFilter {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

impl FilterSource for InlineFilter {
    fn open(&self, name: &str) -> io::Result<Box<dyn BufRead + Send>> {
        if name != self.name {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("no asset named {}", name)));
        }
        Ok(Box::new(Cursor::new(self.text.clone().into_bytes())))
    }
}
