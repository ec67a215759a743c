//! Appfilter Parser
//!
//! Streams an appfilter definition line by line and collects the components
//! it already themes. This is deliberately not an XML parser: it looks for a
//! handful of fixed markers and tolerates anything else on a line.

use std::io::BufRead;
use std::sync::Arc;

use iconrequest_core::{FilterEntry, RequestError, ThemedComponentSet, ValidationReport};
use tracing::{debug, info, warn};

use crate::resources::ResourceResolver;
use crate::source::FilterSource;

/// Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to open your filter {name}: {source}")]
    Open {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read your filter {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    InvalidDrawables(ValidationReport),
}

impl From<ParseError> for RequestError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Open { name, source } => RequestError::FilterOpen { name, source },
            ParseError::Read { name, source } => RequestError::FilterRead { name, source },
            ParseError::InvalidDrawables(report) => RequestError::InvalidDrawable(report.to_string()),
        }
    }
}

const COMPONENT_MARKER: &str = "component=\"ComponentInfo";
const DRAWABLE_MARKER: &str = "drawable=\"";
const VALUE_END: char = '"';
const ITEM_END: &str = "/>";
const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// Result of one parse pass
#[derive(Debug, Clone, Default)]
pub struct ParsedFilter {
    /// Components present in the filter
    pub themed: ThemedComponentSet,
    /// Every emitted item, in file order
    pub entries: Vec<FilterEntry>,
    /// Invalid-drawable diagnostics (strict mode only)
    pub report: ValidationReport,
}

impl ParsedFilter {
    /// Turn a non-empty report into an aggregated error
    pub fn into_checked(self) -> Result<Self, ParseError> {
        if self.report.is_empty() {
            Ok(self)
        } else {
            Err(ParseError::InvalidDrawables(self.report))
        }
    }
}

/// Values carried from one line to the next
#[derive(Debug, Default)]
struct LineState {
    in_comment: bool,
    component: Option<String>,
    drawable: Option<String>,
}

/// Appfilter parser
#[derive(Clone, Default)]
pub struct FilterParser {
    strict: bool,
    resources: Option<Arc<dyn ResourceResolver>>,
}

impl FilterParser {
    /// Create a parser. In strict mode invalid drawables are reported.
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            resources: None,
        }
    }

    /// Validate drawables against a resource resolver
    pub fn with_resources(mut self, resources: Arc<dyn ResourceResolver>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Open and parse a named filter.
    ///
    /// A missing or blank name disables filtering and returns an empty
    /// result without touching the source. In strict mode any diagnostics
    /// are returned as a single [`ParseError::InvalidDrawables`].
    pub fn load(&self, source: &dyn FilterSource, name: Option<&str>) -> Result<ParsedFilter, ParseError> {
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => {
                debug!("Filtering disabled, skipping appfilter");
                return Ok(ParsedFilter::default());
            }
        };

        info!("Loading your appfilter, opening: {}", name);
        let reader = source.open(name).map_err(|source| ParseError::Open {
            name: name.to_string(),
            source,
        })?;

        let parsed = self.parse_reader(name, reader)?;
        info!("Found {} total app(s) in your appfilter.", parsed.themed.len());
        parsed.into_checked()
    }

    /// Parse a stream. Never fails on content, only on I/O.
    pub fn parse_reader<R: BufRead>(&self, name: &str, reader: R) -> Result<ParsedFilter, ParseError> {
        let mut state = LineState::default();
        let mut parsed = ParsedFilter::default();

        for line in reader.lines() {
            let line = line.map_err(|source| ParseError::Read {
                name: name.to_string(),
                source,
            })?;
            self.scan_line(&line, &mut state, &mut parsed);
        }

        Ok(parsed)
    }

    /// Parse filter text held in memory
    pub fn parse_str(&self, text: &str) -> ParsedFilter {
        let mut state = LineState::default();
        let mut parsed = ParsedFilter::default();
        for line in text.lines() {
            self.scan_line(line, &mut state, &mut parsed);
        }
        parsed
    }

    fn scan_line(&self, line: &str, state: &mut LineState, parsed: &mut ParsedFilter) {
        let trimmed = line.trim();
        if !state.in_comment && trimmed.starts_with(COMMENT_START) {
            state.in_comment = true;
        }
        if state.in_comment {
            if trimmed.ends_with(COMMENT_END) {
                state.in_comment = false;
            }
            return;
        }

        if let Some(value) = attribute_value(line, COMPONENT_MARKER) {
            let value = value.strip_prefix('{').unwrap_or(value);
            let value = value.strip_suffix('}').unwrap_or(value);
            state.component = Some(value.to_string());
        }

        if let Some(value) = attribute_value(line, DRAWABLE_MARKER) {
            state.drawable = Some(value.to_string());
        }

        // Values are not reset after an item; they carry until overwritten.
        if line.contains(ITEM_END) && (state.component.is_some() || state.drawable.is_some()) {
            let entry = FilterEntry {
                component: state.component.clone(),
                drawable: state.drawable.clone(),
            };
            self.record(entry, parsed);
        }
    }

    fn record(&self, entry: FilterEntry, parsed: &mut ParsedFilter) {
        let label = entry.component_label().to_string();
        debug!("Found: {} ({})", label, entry.drawable.as_deref().unwrap_or("null"));

        if entry.has_blank_drawable() {
            warn!("Drawable for {} shouldn't be null or empty", label);
            if self.strict {
                parsed.report.push(format!("Drawable for {} was null or empty.", label));
            }
        } else if let (Some(resources), Some(drawable)) = (&self.resources, entry.drawable.as_deref()) {
            let found = resources.has_drawable(drawable).unwrap_or_else(|e| {
                debug!("Resource lookup for {} failed: {}", drawable, e);
                false
            });
            if !found {
                warn!("Drawable {} (for {}) doesn't match up with a resource", drawable, label);
                if self.strict {
                    parsed.report.push(format!(
                        "Drawable {} (for {}) doesn't match up with a resource.",
                        drawable, label
                    ));
                }
            }
        }

        if let Some(component) = &entry.component {
            parsed.themed.insert(component.clone());
        }
        parsed.entries.push(entry);
    }
}

impl std::fmt::Debug for FilterParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterParser")
            .field("strict", &self.strict)
            .field("resources", &self.resources.is_some())
            .finish()
    }
}

/// Value between `marker` and the next quote on the same line
fn attribute_value<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let start = line.find(marker)? + marker.len();
    match line[start..].find(VALUE_END) {
        Some(len) => Some(&line[start..start + len]),
        None => {
            warn!("Unterminated value after {} ignored: {}", marker, line.trim());
            None
        }
    }
}
