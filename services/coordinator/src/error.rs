//! Coordinator error taxonomy.

use bellhop_vault::VaultError;
use thiserror::Error;

/// Errors surfaced by the coordinator and its retrieval endpoint.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// A Vault operation failed during an issuance cycle
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Issuance for this identity ran and failed; the reason was recorded in
    /// the rendezvous slot for the waiting consumer
    #[error("credential issuance failed: {reason}")]
    IssuanceFailed {
        /// Operator-readable failure summary
        reason: String,
    },

    /// No credential was produced before the retrieval deadline
    #[error("timed out waiting for credential")]
    RetrievalTimedOut,

    /// The requested identity falls outside the safe grammar
    #[error("identity contains unsafe characters")]
    InvalidIdentity,

    /// The owning team could not be resolved
    #[error("team lookup failed: {0}")]
    TeamLookupFailed(String),
}

impl CoordinatorError {
    /// Create a team lookup error.
    #[must_use]
    pub fn team_lookup(msg: impl Into<String>) -> Self {
        Self::TeamLookupFailed(msg.into())
    }
}
