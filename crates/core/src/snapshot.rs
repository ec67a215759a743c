//! Saved request state
//!
//! Configuration, loaded apps and selection saved as one unit so a request
//! can be rebuilt after the host process is recreated.

use serde::{Deserialize, Serialize};

use crate::app::App;
use crate::config::RequestConfig;
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub config: RequestConfig,
    pub apps: Option<Vec<App>>,
    pub selected: Vec<App>,
}

impl RequestSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
