//! Error types for icon requests
//!
//! Centralized error handling using thiserror. Each workspace crate keeps
//! its own error enum and converts into [`RequestError`] at the boundary.

use thiserror::Error;

/// Main error type surfaced through request callbacks
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Failed to open your filter {name}: {source}")]
    FilterOpen {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read your filter {name}: {source}")]
    FilterRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    InvalidDrawable(String),

    #[error("{0}")]
    Precondition(String),

    #[error("Failed to save an icon for {package}: {message}")]
    IconSave { package: String, message: String },

    #[error("Failed to write your request {file} file: {source}")]
    ManifestWrite {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("There are no files to put into the ZIP archive.")]
    NothingToArchive,

    #[error("Failed to create the request ZIP file: {0}")]
    Archive(String),

    #[error("Failed to send icons to the backend: {0}")]
    Upload(String),

    #[error("Failed to hand off the request: {0}")]
    Delivery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for request operations
pub type Result<T> = std::result::Result<T, RequestError>;

impl RequestError {
    /// Build a precondition error from a message
    pub fn precondition(msg: impl Into<String>) -> Self {
        RequestError::Precondition(msg.into())
    }

    /// Whether this error comes from misusing the API rather than from I/O
    pub fn is_usage_error(&self) -> bool {
        matches!(self, RequestError::Precondition(_))
    }

    /// Whether the failure happened while loading the filter
    pub fn is_filter_error(&self) -> bool {
        matches!(
            self,
            RequestError::FilterOpen { .. }
                | RequestError::FilterRead { .. }
                | RequestError::InvalidDrawable(_)
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RequestError::InvalidDrawable(report) => {
                format!("Your appfilter references invalid drawables:\n{}", report)
            }
            RequestError::Upload(msg) => {
                format!("Failed to send icons to the backend: {}. Please check your connection.", msg)
            }
            RequestError::Io(e) => format!("File operation failed: {}", e),
            _ => self.to_string(),
        }
    }
}
