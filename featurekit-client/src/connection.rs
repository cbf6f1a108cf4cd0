//! Connection settings.

use crate::token::Token;
use featurekit_types::ConnectionIdentity;
use std::sync::Arc;

/// Where and how to reach one feature service.
#[derive(Debug, Clone)]
pub struct Connection {
    base_url: String,
    token: Option<Arc<Token>>,
    gdb_version: Option<String>,
}

impl Connection {
    /// Creates an anonymous connection to the service at `base_url`
    /// (e.g. `https://host/arcgis/rest/services/City/FeatureServer`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            gdb_version: None,
        }
    }

    pub fn with_token(mut self, token: Arc<Token>) -> Self {
        self.token = Some(token);
        self
    }

    /// Targets a geodatabase version instead of the default one.
    pub fn with_gdb_version(mut self, version: impl Into<String>) -> Self {
        self.gdb_version = Some(version.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&Arc<Token>> {
        self.token.as_ref()
    }

    pub fn gdb_version(&self) -> Option<&str> {
        self.gdb_version.as_deref()
    }

    /// The identity that keys the schema cache and groups edit batches.
    pub fn identity(&self) -> ConnectionIdentity {
        ConnectionIdentity::new(
            self.base_url.clone(),
            self.token.as_ref().map(|t| t.key().to_string()),
            self.gdb_version.clone(),
        )
    }
}
