//! Vault error types using thiserror 2.0.
//!
//! One variant per failure mode of the issuance protocol, so callers can
//! abort a cycle with a precise, operator-readable reason.

use thiserror::Error;

/// Vault-specific errors.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Authority unreachable (network, DNS, or server-side failure)
    #[error("Vault unreachable: {0}")]
    Unreachable(String),

    /// Authority rejected the bearer credential
    #[error("Vault rejected credential: {0}")]
    Rejected(String),

    /// Token creation failed
    #[error("token creation failed: {0}")]
    TokenCreationFailed(String),

    /// Policy upsert failed
    #[error("policy write failed for '{name}': {reason}")]
    PolicyWriteFailed {
        /// Name of the policy being written
        name: String,
        /// Failure reason
        reason: String,
    },

    /// Secret storage write failed
    #[error("secret write failed at '{path}': {reason}")]
    SecretWriteFailed {
        /// Storage path being written
        path: String,
        /// Failure reason
        reason: String,
    },

    /// Identity contains characters outside the safe grammar
    #[error("identity contains unsafe characters")]
    InvalidIdentity,

    /// Policy template could not be read, parsed, or executed
    #[error("template render failed: {0}")]
    TemplateRender(String),

    /// Unexpected HTTP status from the authority
    #[error("unexpected status {status} from Vault: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for Vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Create an unreachable error.
    #[must_use]
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Create a rejected-credential error.
    #[must_use]
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Create a template render error.
    #[must_use]
    pub fn template(msg: impl Into<String>) -> Self {
        Self::TemplateRender(msg.into())
    }
}
