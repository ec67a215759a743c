//! Request Configuration
//!
//! Manages the settings of one icon request:
//! - Filter to load (or filtering disabled)
//! - Recipient and message templates
//! - Generated manifest formats
//! - Optional remote upload endpoint
//!
//! The configuration is a plain serializable value. Callbacks live
//! separately and are re-attached after a restore.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default filter asset name
pub const DEFAULT_FILTER_NAME: &str = "appfilter.xml";

/// Subject used when none (or a blank one) is configured
pub const DEFAULT_SUBJECT: &str = "Icon Request";

/// Default message header
pub const DEFAULT_HEADER: &str = "These apps aren't themed on my device, theme them please!";

/// Name of the working directory under the cache directory
pub const WORK_DIR_NAME: &str = "icon_requests";

/// Remote upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the request service
    pub host: String,
    /// API key sent in the `TokenID` header
    pub api_key: String,
    /// Requester identity
    pub sender: String,
}

impl RemoteConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            sender: sender.into(),
        }
    }

    /// Full URL for a path on the configured host
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.host.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// Configuration for one icon request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Working directory for icons, manifests and the archive
    pub save_dir: PathBuf,
    /// Filter asset name, `None` disables filtering
    pub filter_name: Option<String>,
    /// Recipient email address
    pub email: Option<String>,
    /// Email subject
    pub subject: Option<String>,
    /// Message header
    pub header: Option<String>,
    /// Message footer
    pub footer: Option<String>,
    /// Append OS and device details to the message
    pub include_device_info: bool,
    /// Generate `appfilter.xml`
    pub generate_markup: bool,
    /// Generate `appfilter.json`
    pub generate_json: bool,
    /// Treat invalid filter drawables as a load error
    pub strict_drawables: bool,
    /// Upload to a remote service instead of email
    pub remote: Option<RemoteConfig>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
            filter_name: Some(DEFAULT_FILTER_NAME.to_string()),
            email: None,
            subject: Some(DEFAULT_SUBJECT.to_string()),
            header: Some(DEFAULT_HEADER.to_string()),
            footer: None,
            include_device_info: true,
            generate_markup: true,
            generate_json: false,
            strict_drawables: true,
            remote: None,
        }
    }
}

impl RequestConfig {
    /// Start building a configuration
    pub fn builder() -> RequestConfigBuilder {
        RequestConfigBuilder::new()
    }

    /// Filter name, `None` when filtering is disabled or the name is blank
    pub fn filter(&self) -> Option<&str> {
        self.filter_name.as_deref().filter(|name| !name.trim().is_empty())
    }

    /// Whether the request goes to a remote service
    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Recipient, `None` when unset or blank
    pub fn recipient(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| !email.trim().is_empty())
    }

    /// Subject, falling back to the default when unset or blank
    pub fn effective_subject(&self) -> &str {
        self.subject
            .as_deref()
            .filter(|subject| !subject.trim().is_empty())
            .unwrap_or(DEFAULT_SUBJECT)
    }

    /// Whether the markup manifest is produced for this request
    pub fn wants_markup(&self) -> bool {
        self.generate_markup && !self.is_remote()
    }

    /// Whether the JSON manifest is produced for this request
    pub fn wants_json(&self) -> bool {
        self.generate_json || self.is_remote()
    }
}

/// Builder for [`RequestConfig`]
#[derive(Debug, Clone, Default)]
pub struct RequestConfigBuilder {
    config: RequestConfig,
}

impl RequestConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Working directory (wiped on build)
    pub fn save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.save_dir = dir.into();
        self
    }

    pub fn filter_name(mut self, name: impl Into<String>) -> Self {
        self.config.filter_name = Some(name.into());
        self
    }

    /// Disable filtering: every installed app is a candidate
    pub fn filter_off(mut self) -> Self {
        self.config.filter_name = None;
        self
    }

    pub fn to_email(mut self, email: impl Into<String>) -> Self {
        self.config.email = Some(email.into());
        self
    }

    pub fn subject(mut self, subject: Option<String>) -> Self {
        self.config.subject = subject;
        self
    }

    pub fn header(mut self, header: Option<String>) -> Self {
        self.config.header = header;
        self
    }

    pub fn footer(mut self, footer: Option<String>) -> Self {
        self.config.footer = footer;
        self
    }

    pub fn include_device_info(mut self, include: bool) -> Self {
        self.config.include_device_info = include;
        self
    }

    pub fn generate_markup(mut self, generate: bool) -> Self {
        self.config.generate_markup = generate;
        self
    }

    pub fn generate_json(mut self, generate: bool) -> Self {
        self.config.generate_json = generate;
        self
    }

    pub fn strict_drawables(mut self, strict: bool) -> Self {
        self.config.strict_drawables = strict;
        self
    }

    pub fn remote(mut self, remote: Option<RemoteConfig>) -> Self {
        self.config.remote = remote;
        self
    }

    /// Finish the configuration, wiping the working directory
    pub fn build(self) -> RequestConfig {
        wipe_dir(&self.config.save_dir);
        self.config
    }
}

impl From<RequestConfig> for RequestConfigBuilder {
    /// Continue building from an existing configuration
    fn from(config: RequestConfig) -> Self {
        Self { config }
    }
}

/// Default working directory under the user cache directory
pub fn default_save_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(WORK_DIR_NAME)
}

/// Remove a directory and everything in it, ignoring failures
fn wipe_dir(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!("Wiped working directory {:?}", dir),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to wipe working directory {:?}: {}", dir, e),
    }
}
