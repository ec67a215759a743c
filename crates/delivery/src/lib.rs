//! Icon Request Delivery
//!
//! Hands a packaged request to its destination: a multipart upload to the
//! request backend, or an email draft with the archive attached.

pub mod email;
pub mod upload;

pub use email::{EmailComposer, EmailRequest, EmlDraftComposer};
pub use upload::{RemoteUploader, RequestUploader, USER_AGENT};

use iconrequest_core::RequestError;

/// Delivery errors
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Backend responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid address {address}: {message}")]
    Address { address: String, message: String },
    #[error("Failed to build the message: {0}")]
    Message(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DeliveryError> for RequestError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::Network(_) | DeliveryError::Status { .. } => RequestError::Upload(err.to_string()),
            other => RequestError::Delivery(other.to_string()),
        }
    }
}
