//! Bellhop coordinator - main entry point.
//!
//! Loads configuration, constructs the backend set, and runs two listeners:
//! a plain HTTP listener for orchestrator lifecycle events and a TLS
//! listener for credential retrieval.

use anyhow::Context;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use bellhop_coordinator::coordinator::{CoordinatorSettings, TeamSource};
use bellhop_coordinator::{Backend, Config, SecretCoordinator, api, server, shutdown};
use bellhop_vault::{PolicyTemplate, VaultConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Missing or malformed mandatory options are fatal here, before any
    // listener comes up.
    let config = Config::from_env().context("loading configuration")?;
    info!(
        vault_addr = %config.vault_addr,
        events_port = config.events_port,
        secret_port = config.secret_port,
        "starting bellhop coordinator"
    );

    let template = PolicyTemplate::load(&config.policy_template_path)
        .context("loading policy template")?;

    let team_source = config.orchestrator_endpoint.as_ref().map_or(
        TeamSource::PathPrefix,
        |endpoint| TeamSource::Orchestrator {
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
            username: config.orchestrator_username.clone(),
            password: config.orchestrator_password.clone(),
        },
    );

    let settings = CoordinatorSettings {
        vault: VaultConfig::new(config.vault_addr.as_str())
            .with_timeout(Duration::from_secs(config.vault_request_timeout_secs)),
        service_token: config.vault_token.clone(),
        token_ttl: Duration::from_secs(config.token_ttl_secs),
        retrieval_timeout: Duration::from_secs(config.retrieval_timeout_secs),
        template,
        team_source,
    };
    let coordinator = Arc::new(SecretCoordinator::new(settings)?);

    let mut backends = vec![Backend::SecretDistributor(Arc::clone(&coordinator))];
    if config.debug_backend_enabled {
        backends.push(Backend::Debug);
    }
    let backends = Arc::new(backends);

    let events_addr: SocketAddr = format!("{}:{}", config.host, config.events_port)
        .parse()
        .context("events listener address")?;
    let secret_addr: SocketAddr = format!("{}:{}", config.host, config.secret_port)
        .parse()
        .context("retrieval listener address")?;

    // One process-level TLS provider; reqwest already links ring.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("rustls crypto provider already installed"))?;

    // Fail fast on a broken keypair rather than at the first retrieval.
    let tls = RustlsConfig::from_pem_file(&config.tls_cert_path, &config.tls_key_path)
        .await
        .context("loading TLS keypair")?;

    let handle = Handle::new();
    {
        let handle = handle.clone();
        let grace = Duration::from_secs(config.shutdown_timeout_secs);
        tokio::spawn(async move {
            shutdown::shutdown_signal().await;
            handle.graceful_shutdown(Some(grace));
        });
    }

    let events_listener = tokio::net::TcpListener::bind(events_addr)
        .await
        .context("binding events listener")?;
    info!(addr = %events_addr, "event ingestion listening");
    info!(addr = %secret_addr, "credential retrieval listening (TLS)");

    let events_server = axum::serve(events_listener, api::router(Arc::clone(&backends)))
        .with_graceful_shutdown(shutdown::shutdown_signal());
    let secret_server = axum_server::bind_rustls(secret_addr, tls)
        .handle(handle)
        .serve(server::router(coordinator).into_make_service());

    tokio::try_join!(
        async { events_server.await.context("events listener") },
        async { secret_server.await.context("retrieval listener") },
    )?;

    info!("bellhop coordinator stopped");
    Ok(())
}
