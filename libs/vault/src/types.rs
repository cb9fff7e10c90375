//! Vault wire types and the credential token handed between components.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// A leased bearer token minted by Vault.
///
/// The token value is wrapped in [`SecretString`] and redacted from `Debug`
/// output; it is only ever read through [`CredentialToken::expose`].
#[derive(Clone)]
pub struct CredentialToken {
    value: SecretString,
    ttl: Duration,
    renewable: bool,
}

impl CredentialToken {
    /// Wrap a freshly minted token.
    #[must_use]
    pub fn new(value: impl Into<String>, ttl: Duration, renewable: bool) -> Self {
        Self {
            value: SecretString::from(value.into()),
            ttl,
            renewable,
        }
    }

    /// The bearer value itself. Callers must not log or persist it.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Lease duration granted by the authority.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether the lease can be renewed.
    #[must_use]
    pub const fn renewable(&self) -> bool {
        self.renewable
    }
}

impl std::fmt::Debug for CredentialToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialToken")
            .field("value", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .field("renewable", &self.renewable)
            .finish()
    }
}

/// Response body of `POST v1/auth/token/create`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenCreateResponse {
    pub auth: TokenAuth,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenAuth {
    pub client_token: String,
    pub lease_duration: u64,
    pub renewable: bool,
}

impl From<TokenAuth> for CredentialToken {
    fn from(auth: TokenAuth) -> Self {
        Self::new(
            auth.client_token,
            Duration::from_secs(auth.lease_duration),
            auth.renewable,
        )
    }
}
