//! Icon Request Core - data model and shared types
//!
//! This crate holds the values every other part of the workspace passes
//! around: app records, filter results, the selection, configuration,
//! callbacks and the unified error type.

pub mod app;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod filter;
pub mod selection;
pub mod snapshot;

pub use app::{App, AppSource, IconImage, IconSource, ProgressSink};
pub use config::{RemoteConfig, RequestConfig, RequestConfigBuilder};
pub use device::DeviceInfo;
pub use error::{RequestError, Result};
pub use events::{Callbacks, EventQueue, EventSender, LoadCallback, RequestEvent, SendCallback};
pub use filter::{FilterEntry, ThemedComponentSet, ValidationReport};
pub use selection::{SelectionListener, SelectionSet};
pub use snapshot::RequestSnapshot;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
