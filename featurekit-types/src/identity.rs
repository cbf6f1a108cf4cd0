//! Connection identity.

use std::fmt;

/// Identifies one logical connection to a feature service.
///
/// Two identities are equal when their base URL, credential key and
/// geodatabase version are equal. The identity keys the schema cache and
/// decides which records may be edited together in one batch.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionIdentity {
    base_url: String,
    credential: Option<String>,
    gdb_version: Option<String>,
}

impl ConnectionIdentity {
    /// Creates an identity. Trailing slashes on the base URL are ignored.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        credential: Option<String>,
        gdb_version: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            credential,
            gdb_version,
        }
    }

    /// Returns the service base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the stable key of the credential (literal token or generator key).
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Returns the geodatabase version, if one is pinned.
    #[must_use]
    pub fn gdb_version(&self) -> Option<&str> {
        self.gdb_version.as_deref()
    }
}

// Credentials stay out of logs.
impl fmt::Debug for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionIdentity")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("gdb_version", &self.gdb_version)
            .finish()
    }
}

impl fmt::Display for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.gdb_version {
            Some(version) => write!(f, "{} ({version})", self.base_url),
            None => f.write_str(&self.base_url),
        }
    }
}
