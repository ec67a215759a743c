//! Remote request backend upload

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info};

use iconrequest_core::RemoteConfig;

use crate::DeliveryError;

/// User agent sent with every upload
pub const USER_AGENT: &str = concat!("iconrequest/", env!("CARGO_PKG_VERSION"));

/// Request endpoint relative to the backend host
pub const REQUEST_PATH: &str = "/v1/request";

/// Sends a packaged request to the backend
#[async_trait]
pub trait RequestUploader: Send + Sync {
    /// Upload `archive` with the JSON manifest as the app list
    async fn upload(&self, remote: &RemoteConfig, archive: &Path, apps_json: &str) -> Result<(), DeliveryError>;
}

/// Multipart uploader over HTTP
#[derive(Debug, Clone)]
pub struct RemoteUploader {
    client: Client,
}

impl RemoteUploader {
    /// Create an uploader with the default timeout
    pub fn new() -> Result<Self, DeliveryError> {
        Self::with_timeout(Duration::from_secs(60))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RequestUploader for RemoteUploader {
    async fn upload(&self, remote: &RemoteConfig, archive: &Path, apps_json: &str) -> Result<(), DeliveryError> {
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "IconRequest.zip".to_string());
        let bytes = tokio::fs::read(archive).await?;
        debug!("Uploading {} ({} bytes)", file_name, bytes.len());

        let part = Part::bytes(bytes).file_name(file_name).mime_str("application/zip")?;
        let form = Form::new()
            .part("archive", part)
            .text("requester", remote.sender.clone())
            .text("apps", apps_json.to_string());

        let url = remote.endpoint(REQUEST_PATH);
        let response = self
            .client
            .post(&url)
            .header("TokenID", remote.api_key.as_str())
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("Request uploaded to {}", url);
        Ok(())
    }
}
