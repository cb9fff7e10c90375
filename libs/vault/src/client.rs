//! Vault HTTP client.
//!
//! A [`VaultClient`] is bound to one authority address and one bearer token
//! at construction. The issuance protocol rebinds mid-cycle (service token
//! first, then the narrower carrier token), so rebinding is just building a
//! second client. No call is retried here.

use crate::{
    config::VaultConfig,
    error::{VaultError, VaultResult},
    types::{CredentialToken, TokenCreateResponse},
};
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Vault client bound to one address and bearer token.
pub struct VaultClient {
    http: Client,
    base_url: String,
    token: SecretString,
}

impl VaultClient {
    /// Bind a client to the authority and verify the bearer credential.
    ///
    /// The credential is checked eagerly with a token self-lookup so that an
    /// unreachable authority ([`VaultError::Unreachable`]) and a rejected
    /// credential ([`VaultError::Rejected`]) are distinguishable before any
    /// protocol step runs.
    #[instrument(skip_all, fields(addr = %config.addr))]
    pub async fn authenticate(config: &VaultConfig, token: SecretString) -> VaultResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(VaultError::Http)?;

        let client = Self {
            http,
            base_url: config.base_url().to_string(),
            token,
        };
        client.lookup_self().await?;
        info!("authenticated with Vault");
        Ok(client)
    }

    /// Verify the bound token against `auth/token/lookup-self`.
    async fn lookup_self(&self) -> VaultResult<()> {
        let response = self
            .http
            .get(self.url("auth/token/lookup-self"))
            .header("X-Vault-Token", self.token.expose_secret())
            .send()
            .await
            .map_err(|e| VaultError::unreachable(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                let text = response.text().await.unwrap_or_default();
                Err(VaultError::rejected(text))
            }
            s => {
                let text = response.text().await.unwrap_or_default();
                Err(VaultError::unreachable(format!("status {s}: {text}")))
            }
        }
    }

    /// Mint a new token with the given lease duration.
    ///
    /// The token inherits the policies of the token this client is bound to.
    #[instrument(skip(self, ttl), fields(ttl_secs = ttl.as_secs()))]
    pub async fn create_token(&self, ttl: Duration) -> VaultResult<CredentialToken> {
        let body = serde_json::json!({ "ttl": format!("{}s", ttl.as_secs()) });
        let response: TokenCreateResponse = self
            .request(Method::POST, "auth/token/create", Some(body))
            .await
            .map_err(|e| VaultError::TokenCreationFailed(e.to_string()))?;

        debug!("minted token");
        Ok(response.auth.into())
    }

    /// Upsert the named access policy.
    #[instrument(skip(self, document))]
    pub async fn write_policy(&self, name: &str, document: &str) -> VaultResult<()> {
        let body = serde_json::json!({ "policy": document });
        self.request_no_content(
            Method::PUT,
            &format!("sys/policies/acl/{name}"),
            Some(body),
        )
        .await
        .map_err(|e| VaultError::PolicyWriteFailed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        debug!("wrote policy");
        Ok(())
    }

    /// Store an opaque payload at a storage path.
    ///
    /// With a `cubbyhole/` path the payload is only reachable by the token
    /// this client is bound to.
    #[instrument(skip(self, payload))]
    pub async fn write_secret(&self, path: &str, payload: serde_json::Value) -> VaultResult<()> {
        self.request_no_content(Method::POST, path, Some(payload))
            .await
            .map_err(|e| VaultError::SecretWriteFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        debug!("wrote secret payload");
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.base_url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> VaultResult<reqwest::Response> {
        let mut request = self
            .http
            .request(method, self.url(path))
            .header("X-Vault-Token", self.token.expose_secret());
        if let Some(b) = body {
            request = request.json(&b);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VaultError::unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        match status {
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Err(VaultError::rejected(text)),
            s if s.is_server_error() => {
                Err(VaultError::unreachable(format!("status {s}: {text}")))
            }
            s => Err(VaultError::UnexpectedStatus {
                status: s.as_u16(),
                message: text,
            }),
        }
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> VaultResult<T> {
        let response = self.send(method, path, body).await?;
        response.json().await.map_err(VaultError::Http)
    }

    /// For write endpoints that answer `204 No Content`.
    async fn request_no_content(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> VaultResult<()> {
        self.send(method, path, body).await.map(|_| ())
    }
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
