//! Client configuration.

use crate::error::{ClientResult, Error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP and download settings shared by every request a service makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Concurrent batch fetches when a query does not set its own.
    pub default_parallelism: usize,
    /// Upper bound on object ids sent in one query.
    pub max_ids_per_request: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: format!("featurekit/{}", env!("CARGO_PKG_VERSION")),
            default_parallelism: 4,
            max_ids_per_request: 1000,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client for this configuration.
    pub fn http_client(&self) -> ClientResult<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .user_agent(self.user_agent.clone())
            .gzip(true)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))
    }
}
