//! Appfilter Manager
//!
//! Reads icon-pack appfilter definitions and reports which app components
//! they already theme, optionally checking every drawable against the
//! pack's resources.

pub mod parser;
pub mod resources;
pub mod source;

pub use parser::{FilterParser, ParseError, ParsedFilter};
pub use resources::{DrawableDir, DrawableSet, ResourceResolver};
pub use source::{AssetDir, FilterSource, InlineFilter};
