//! Vault client configuration.

use std::time::Duration;

/// Connection settings for one Vault authority.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault server address, e.g. `https://vault.service:8200`
    pub addr: String,
    /// Request timeout applied to every call
    pub timeout: Duration,
}

impl VaultConfig {
    /// Create a configuration for the given authority address.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Authority address with any trailing slash removed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.addr.trim_end_matches('/')
    }
}
