//! Filter parse results
//!
//! Values produced by one pass over an appfilter definition.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Component identifiers already present in the filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemedComponentSet {
    components: HashSet<String>,
}

impl ThemedComponentSet {
    /// Create an empty set (filtering disabled)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component identifier, returns whether it was new
    pub fn insert(&mut self, component: impl Into<String>) -> bool {
        self.components.insert(component.into())
    }

    /// Whether the component is already themed
    pub fn contains(&self, component: &str) -> bool {
        self.components.contains(component)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }
}

impl FromIterator<String> for ThemedComponentSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            components: iter.into_iter().collect(),
        }
    }
}

/// A `(component, drawable)` pair found in the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub component: Option<String>,
    pub drawable: Option<String>,
}

impl FilterEntry {
    /// Component label used in diagnostics
    pub fn component_label(&self) -> &str {
        self.component.as_deref().unwrap_or("null")
    }

    /// Whether the drawable is missing or blank
    pub fn has_blank_drawable(&self) -> bool {
        self.drawable.as_deref().map_or(true, |d| d.trim().is_empty())
    }
}

/// Invalid-drawable diagnostics from one parse call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    diagnostics: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic line
    pub fn push(&mut self, diagnostic: impl Into<String>) {
        self.diagnostics.push(diagnostic.into());
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostics.join("\n"))
    }
}
