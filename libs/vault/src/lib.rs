//! HashiCorp Vault client for Bellhop.
//!
//! Provides the low-level operations the secret distribution protocol is
//! built from: bind a client to an authority address with a bearer token,
//! mint leased tokens, upsert access policies, and write payloads to
//! token-scoped storage paths. The client is deliberately stateless and
//! performs no retries; retry policy belongs to the caller.

pub mod client;
pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use client::VaultClient;
pub use config::VaultConfig;
pub use error::{VaultError, VaultResult};
pub use policy::{PolicyTemplate, is_safe_identity};
pub use types::CredentialToken;
