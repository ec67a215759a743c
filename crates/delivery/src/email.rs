//! Email hand-off
//!
//! The request leaves the library as a ready-to-send message: recipient,
//! subject, HTML body and the archive as an attachment.

use std::fs;
use std::path::{Path, PathBuf};

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use tracing::info;

use crate::DeliveryError;

/// Default sender on drafts, replaced by the mail client on send
pub const DEFAULT_DRAFT_SENDER: &str = "Icon Request <iconrequest@localhost>";

/// Everything the email collaborator needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub recipient: String,
    pub subject: String,
    /// HTML body
    pub body: String,
    pub archive: PathBuf,
}

/// Builds the user-facing email hand-off
pub trait EmailComposer: Send + Sync {
    /// Compose the message and return where it was handed off to
    fn compose(&self, request: &EmailRequest) -> Result<PathBuf, DeliveryError>;
}

/// Writes an RFC 5322 draft (`.eml`) next to the archive
#[derive(Debug, Clone)]
pub struct EmlDraftComposer {
    sender: String,
    out_dir: Option<PathBuf>,
}

impl Default for EmlDraftComposer {
    fn default() -> Self {
        Self {
            sender: DEFAULT_DRAFT_SENDER.to_string(),
            out_dir: None,
        }
    }
}

impl EmlDraftComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Write drafts into `dir` instead of next to the archive
    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    /// Build the message for `request`
    pub fn build_message(&self, request: &EmailRequest) -> Result<Message, DeliveryError> {
        let from = parse_mailbox(&self.sender)?;
        let to = parse_mailbox(&request.recipient)?;

        let file_name = archive_file_name(&request.archive);
        let bytes = fs::read(&request.archive)?;
        let zip_type = ContentType::parse("application/zip").map_err(|e| DeliveryError::Message(e.to_string()))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(request.subject.as_str())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(request.body.clone()))
                    .singlepart(Attachment::new(file_name).body(bytes, zip_type)),
            )
            .map_err(|e| DeliveryError::Message(e.to_string()))
    }

    fn draft_path(&self, archive: &Path) -> PathBuf {
        let dir = self
            .out_dir
            .clone()
            .or_else(|| archive.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let stem = archive
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "IconRequest".to_string());
        dir.join(format!("{}.eml", stem))
    }
}

impl EmailComposer for EmlDraftComposer {
    fn compose(&self, request: &EmailRequest) -> Result<PathBuf, DeliveryError> {
        let message = self.build_message(request)?;
        let path = self.draft_path(&request.archive);
        fs::write(&path, message.formatted())?;
        info!("Email draft for {} written to {}", request.recipient, path.display());
        Ok(path)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address.trim().parse().map_err(|e: lettre::address::AddressError| DeliveryError::Address {
        address: address.to_string(),
        message: e.to_string(),
    })
}

fn archive_file_name(archive: &Path) -> String {
    archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "IconRequest.zip".to_string())
}
