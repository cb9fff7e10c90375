//! Secret Distribution Coordinator.
//!
//! Runs the issuance protocol for each application that reaches the running
//! state and serves the blocking retrieval operation. Per cycle, two tokens
//! are minted: the carrier token T1, scoped by the application's policy to
//! one cubbyhole path, and the payload token T2, the working credential. T2
//! is stored behind T1 in the cubbyhole, and only T1 is handed out; after
//! that write this component never sees T2 again. Failed cycles leave any
//! minted token to expire via its TTL.

use crate::{
    error::CoordinatorError,
    rendezvous::{Delivery, RendezvousRegistry},
};
use bellhop_vault::{CredentialToken, PolicyTemplate, VaultClient, VaultConfig, is_safe_identity};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Where the owning team for an application comes from.
#[derive(Debug, Clone)]
pub enum TeamSource {
    /// Query the orchestrator's REST API and read the app's `team` label
    Orchestrator {
        /// Base endpoint, e.g. `https://marathon.acme.org/v2/apps`
        endpoint: String,
        /// Basic-auth username, if the API requires it
        username: Option<String>,
        /// Basic-auth password
        password: Option<SecretString>,
    },
    /// Use the first path segment of the identity (`myteam/myapp` → `myteam`)
    PathPrefix,
}

/// Everything one coordinator needs to run issuance cycles.
pub struct CoordinatorSettings {
    /// Vault address and request timeout
    pub vault: VaultConfig,
    /// This service's own long-lived Vault credential
    pub service_token: SecretString,
    /// Lease duration requested for both minted tokens
    pub token_ttl: Duration,
    /// Deadline applied to every retrieval request
    pub retrieval_timeout: Duration,
    /// Parsed policy template
    pub template: PolicyTemplate,
    /// Team resolution strategy
    pub team_source: TeamSource,
}

/// Coordinates credential issuance and retrieval.
pub struct SecretCoordinator {
    settings: CoordinatorSettings,
    registry: RendezvousRegistry,
    http: reqwest::Client,
}

/// Orchestrator app-detail response, reduced to the label map.
#[derive(Debug, Deserialize)]
struct AppResponse {
    app: AppDetail,
}

#[derive(Debug, Deserialize)]
struct AppDetail {
    #[serde(default)]
    labels: HashMap<String, String>,
}

impl SecretCoordinator {
    /// Build a coordinator. Fails only if the HTTP client cannot be built.
    pub fn new(settings: CoordinatorSettings) -> Result<Self, CoordinatorError> {
        let http = reqwest::Client::builder()
            .timeout(settings.vault.timeout)
            .build()
            .map_err(bellhop_vault::VaultError::Http)?;
        Ok(Self {
            settings,
            registry: RendezvousRegistry::new(),
            http,
        })
    }

    /// React to a task reaching the running state.
    ///
    /// Fire-and-forget: failures abort the rest of the cycle, are logged,
    /// and are recorded in the rendezvous slot so a blocked consumer learns
    /// that generation failed.
    #[instrument(skip_all, fields(app_id = %app_id))]
    pub async fn handle_running(&self, app_id: &str) {
        let identity = app_id.strip_prefix('/').unwrap_or(app_id);
        if !is_safe_identity(identity) {
            warn!("dropping event with unsafe application id");
            return;
        }

        self.registry.ensure_slot(identity);
        match self.issue(identity).await {
            Ok(()) => info!(app_id = %identity, "credential issuance complete"),
            Err(e) => {
                error!(app_id = %identity, error = %e, "credential issuance failed");
                self.registry
                    .produce(identity, Delivery::Failed(e.to_string()));
            }
        }
    }

    /// One issuance cycle. Ordering is load-bearing: the policy write must
    /// land before either token is minted, both tokens before the cubbyhole
    /// write, and the write before the hand-off.
    async fn issue(&self, identity: &str) -> Result<(), CoordinatorError> {
        let client = VaultClient::authenticate(
            &self.settings.vault,
            self.settings.service_token.clone(),
        )
        .await?;

        let team = self.resolve_team(identity).await?;
        let document = self.settings.template.render(&team, identity)?;
        client.write_policy(identity, &document).await?;

        let carrier = client.create_token(self.settings.token_ttl).await?;
        let payload = client.create_token(self.settings.token_ttl).await?;

        // Rebind to the carrier token: the cubbyhole write below must happen
        // under its narrower authority, which also ties the stored payload
        // to the token being handed out.
        let carrier_client = VaultClient::authenticate(
            &self.settings.vault,
            SecretString::from(carrier.expose().to_string()),
        )
        .await?;
        carrier_client
            .write_secret(
                &format!("cubbyhole/{identity}"),
                serde_json::json!({ "secret": payload.expose() }),
            )
            .await?;

        self.registry.produce(identity, Delivery::Issued(carrier));
        Ok(())
    }

    /// Block until the identity's credential is available, then take it.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, app_id: &str) -> Result<CredentialToken, CoordinatorError> {
        let identity = app_id.strip_prefix('/').unwrap_or(app_id);
        if !is_safe_identity(identity) {
            return Err(CoordinatorError::InvalidIdentity);
        }

        self.registry.ensure_slot(identity);
        match self
            .registry
            .consume(identity, self.settings.retrieval_timeout)
            .await
        {
            Some(Delivery::Issued(token)) => {
                info!(app_id = %identity, "credential delivered");
                Ok(token)
            }
            Some(Delivery::Failed(reason)) => Err(CoordinatorError::IssuanceFailed { reason }),
            None => Err(CoordinatorError::RetrievalTimedOut),
        }
    }

    /// Resolve the team owning `identity`.
    async fn resolve_team(&self, identity: &str) -> Result<String, CoordinatorError> {
        match &self.settings.team_source {
            TeamSource::PathPrefix => identity
                .split('/')
                .next()
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .ok_or_else(|| CoordinatorError::team_lookup("identity has no team segment")),
            TeamSource::Orchestrator {
                endpoint,
                username,
                password,
            } => {
                let mut request = self.http.get(format!("{endpoint}/{identity}"));
                if let (Some(user), Some(pass)) = (username, password) {
                    request = request.basic_auth(user, Some(pass.expose_secret()));
                }

                let response = request
                    .send()
                    .await
                    .map_err(|e| CoordinatorError::team_lookup(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(CoordinatorError::team_lookup(format!(
                        "status {}",
                        response.status()
                    )));
                }

                let body: AppResponse = response
                    .json()
                    .await
                    .map_err(|e| CoordinatorError::team_lookup(e.to_string()))?;
                body.app
                    .labels
                    .get("team")
                    .filter(|team| !team.is_empty())
                    .cloned()
                    .ok_or_else(|| CoordinatorError::team_lookup("app has no team label"))
            }
        }
    }
}

impl std::fmt::Debug for SecretCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCoordinator").finish_non_exhaustive()
    }
}
