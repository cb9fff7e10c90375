//! End-to-end tests for the issuance protocol against a mocked Vault.

use bellhop_coordinator::coordinator::{CoordinatorSettings, TeamSource};
use bellhop_coordinator::{Backend, CoordinatorError, SecretCoordinator, api, server};
use bellhop_vault::{PolicyTemplate, VaultConfig};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POLICY_TEMPLATE: &str = r#"path "cubbyhole/{{app_id}}" {
  capabilities = ["read"]
}
path "secret/{{team_id}}/*" {
  capabilities = ["read"]
}
"#;

fn coordinator(vault: &MockServer, team_source: TeamSource) -> Arc<SecretCoordinator> {
    let settings = CoordinatorSettings {
        vault: VaultConfig::new(vault.uri()).with_timeout(Duration::from_secs(2)),
        service_token: SecretString::from("service-token"),
        token_ttl: Duration::from_secs(3600),
        retrieval_timeout: Duration::from_secs(2),
        template: PolicyTemplate::from_source(POLICY_TEMPLATE).unwrap(),
        team_source,
    };
    Arc::new(SecretCoordinator::new(settings).unwrap())
}

fn token_response(value: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "auth": {
            "client_token": value,
            "lease_duration": 3600,
            "renewable": true
        }
    }))
}

/// Mount the happy-path Vault mocks for one full cycle on `/myteam/myapp`.
async fn mount_full_cycle(vault: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": {} })))
        .mount(vault)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v1/sys/policies/acl/myteam/myapp"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .named("policy write")
        .mount(vault)
        .await;

    // First mint is the carrier token, second the payload token.
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/create"))
        .respond_with(token_response("s.carrier"))
        .up_to_n_times(1)
        .mount(vault)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/create"))
        .respond_with(token_response("s.payload"))
        .up_to_n_times(1)
        .mount(vault)
        .await;

    // The cubbyhole write must arrive under the carrier token's authority
    // and carry the payload token.
    Mock::given(method("POST"))
        .and(path("/v1/cubbyhole/myteam/myapp"))
        .and(header("X-Vault-Token", "s.carrier"))
        .and(body_json(serde_json::json!({ "secret": "s.payload" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .named("cubbyhole write")
        .mount(vault)
        .await;
}

#[tokio::test]
async fn full_cycle_delivers_carrier_token() {
    let vault = MockServer::start().await;
    mount_full_cycle(&vault).await;

    let coordinator = coordinator(&vault, TeamSource::PathPrefix);
    coordinator.handle_running("/myteam/myapp").await;

    let token = coordinator.retrieve("myteam/myapp").await.unwrap();
    assert_eq!(token.expose(), "s.carrier");
}

#[tokio::test]
async fn retrieval_blocked_before_event_is_unblocked_by_issuance() {
    let vault = MockServer::start().await;
    mount_full_cycle(&vault).await;

    let coordinator = coordinator(&vault, TeamSource::PathPrefix);
    let waiter = Arc::clone(&coordinator);
    let retrieval = tokio::spawn(async move { waiter.retrieve("myteam/myapp").await });

    // Give the retrieval task time to block on the empty slot.
    tokio::time::sleep(Duration::from_millis(50)).await;
    coordinator.handle_running("/myteam/myapp").await;

    let token = retrieval.await.unwrap().unwrap();
    assert_eq!(token.expose(), "s.carrier");
}

#[tokio::test]
async fn authentication_failure_is_reported_to_waiting_consumer() {
    let vault = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&vault)
        .await;
    // Nothing past authentication may run.
    Mock::given(method("PUT"))
        .and(path("/v1/sys/policies/acl/myteam/myapp"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .named("policy write must not happen")
        .mount(&vault)
        .await;

    let coordinator = coordinator(&vault, TeamSource::PathPrefix);
    coordinator.handle_running("/myteam/myapp").await;

    let err = coordinator.retrieve("myteam/myapp").await.unwrap_err();
    assert!(matches!(err, CoordinatorError::IssuanceFailed { .. }));
}

#[tokio::test]
async fn hostile_team_label_never_reaches_policy_write() {
    let vault = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": {} })))
        .mount(&vault)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/sys/policies/acl/myteam/myapp"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .named("policy write must not happen")
        .mount(&vault)
        .await;

    let orchestrator = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myteam/myapp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "app": {
                "labels": {
                    "team": "}\npath \"secret/*\" {\n\tpolicy = \"sudo\"\n}"
                }
            }
        })))
        .mount(&orchestrator)
        .await;

    let coordinator = coordinator(
        &vault,
        TeamSource::Orchestrator {
            endpoint: orchestrator.uri(),
            username: None,
            password: None,
        },
    );
    coordinator.handle_running("/myteam/myapp").await;

    let err = coordinator.retrieve("myteam/myapp").await.unwrap_err();
    match err {
        CoordinatorError::IssuanceFailed { reason } => {
            assert!(reason.contains("unsafe characters"));
        }
        other => panic!("expected issuance failure, got {other}"),
    }
}

#[tokio::test]
async fn team_label_lookup_feeds_policy_render() {
    let vault = MockServer::start().await;
    mount_full_cycle(&vault).await;

    let orchestrator = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myteam/myapp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "app": { "labels": { "team": "platform" } }
        })))
        .expect(1)
        .mount(&orchestrator)
        .await;

    let coordinator = coordinator(
        &vault,
        TeamSource::Orchestrator {
            endpoint: orchestrator.uri(),
            username: None,
            password: None,
        },
    );
    coordinator.handle_running("/myteam/myapp").await;

    let token = coordinator.retrieve("myteam/myapp").await.unwrap();
    assert_eq!(token.expose(), "s.carrier");
}

#[tokio::test]
async fn http_surfaces_accept_event_and_deliver_secret() {
    let vault = MockServer::start().await;
    mount_full_cycle(&vault).await;
    let coordinator = coordinator(&vault, TeamSource::PathPrefix);

    let backends = Arc::new(vec![Backend::SecretDistributor(Arc::clone(&coordinator))]);
    let events_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let events_addr = events_listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(events_listener, api::router(backends)).await.unwrap();
    });

    let secret_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let secret_addr = secret_listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(secret_listener, server::router(coordinator)).await.unwrap();
    });

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{events_addr}/events"))
        .json(&serde_json::json!({
            "eventType": "status_update_event",
            "appId": "/myteam/myapp",
            "taskStatus": "TASK_RUNNING",
            "taskId": "myteam_myapp.1",
            "host": "agent-1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    // Retrieval blocks until the dispatched cycle produces the token.
    let response = client
        .get(format!("http://{secret_addr}/secret/myteam/myapp"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["secret"], "s.carrier");
}

#[tokio::test]
async fn unknown_event_type_is_rejected() {
    let vault = MockServer::start().await;
    let coordinator = coordinator(&vault, TeamSource::PathPrefix);
    let backends = Arc::new(vec![Backend::SecretDistributor(coordinator)]);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, api::router(backends)).await.unwrap();
    });

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/events"))
        .json(&serde_json::json!({ "eventType": "deployment_info" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn retrieval_times_out_with_gateway_timeout_status() {
    let vault = MockServer::start().await;
    let settings = CoordinatorSettings {
        vault: VaultConfig::new(vault.uri()).with_timeout(Duration::from_secs(2)),
        service_token: SecretString::from("service-token"),
        token_ttl: Duration::from_secs(3600),
        retrieval_timeout: Duration::from_millis(100),
        template: PolicyTemplate::from_source(POLICY_TEMPLATE).unwrap(),
        team_source: TeamSource::PathPrefix,
    };
    let coordinator = Arc::new(SecretCoordinator::new(settings).unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(coordinator)).await.unwrap();
    });

    let response = reqwest::Client::new()
        .get(format!("http://{addr}/secret/myteam/myapp"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 504);
}
