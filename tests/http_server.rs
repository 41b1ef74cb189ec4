//! Integration tests for the read API.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use aptos_guardian::{
    config::{EndpointConfig, Thresholds},
    engine::{IncidentEngine, IncidentProcessor},
    http_server::{self, ApiState},
    metrics::GuardianMetrics,
    models::{EntityKind, ErrorCategory, Severity},
    persistence::{traits::GuardianRepository, SqliteStore},
};
use tokio::task;
use tokio_util::sync::CancellationToken;

async fn create_test_repo() -> Arc<SqliteStore> {
    let store =
        SqliteStore::new("sqlite::memory:").await.expect("Failed to create in-memory store");
    store.run_migrations().await.expect("Failed to run migrations");
    Arc::new(store)
}

fn endpoint(name: &str, url: &str) -> EndpointConfig {
    EndpointConfig {
        name: name.into(),
        url: url.into(),
        timeout: Duration::from_secs(4),
        tags: HashMap::new(),
    }
}

struct TestServer {
    address: SocketAddr,
    client: reqwest::Client,
    cancellation_token: CancellationToken,
    _server_handle: task::JoinHandle<()>,
}

impl TestServer {
    async fn new(repo: Arc<SqliteStore>) -> Self {
        let engine_repo: Arc<dyn GuardianRepository> = repo.clone();
        let engine = Arc::new(IncidentEngine::new(engine_repo, Thresholds::default()));
        let state = ApiState::new(
            repo,
            engine,
            Arc::new(GuardianMetrics::new().unwrap()),
            vec![
                endpoint("aptoslabs", "https://fullnode.mainnet.aptoslabs.com"),
                endpoint("nodereal", "https://aptos-mainnet.nodereal.io"),
            ],
            vec![endpoint("aptos-explorer", "https://explorer.aptoslabs.com")],
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let address = listener.local_addr().expect("Failed to get address");
        drop(listener); // Release port for the app to use

        let cancellation_token = CancellationToken::new();
        let server_token = cancellation_token.clone();
        let listen_address = address.to_string();
        let server_handle = task::spawn(async move {
            http_server::run_server(state, &listen_address, "/metrics", server_token)
                .await
                .expect("Server failed");
        });

        // Wait for the server to start accepting connections.
        tokio::time::sleep(Duration::from_millis(200)).await;

        Self { address, client: reqwest::Client::new(), cancellation_token, _server_handle: server_handle }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.expect("GET failed")
    }

    fn cleanup(&self) {
        self.cancellation_token.cancel();
    }
}

#[tokio::test]
async fn healthz_returns_ok_text() {
    let server = TestServer::new(create_test_repo().await).await;

    let resp = server.get("/healthz").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");

    server.cleanup();
}

#[tokio::test]
async fn status_reports_snapshot_and_recommendation() {
    let repo = create_test_repo().await;
    for _ in 0..3 {
        repo.insert_check(EntityKind::Rpc, "aptoslabs", true, Some(80), None).await.unwrap();
        repo.insert_check(
            EntityKind::Rpc,
            "nodereal",
            false,
            None,
            Some(ErrorCategory::Timeout),
        )
        .await
        .unwrap();
    }
    repo.insert_check(EntityKind::Dapp, "aptos-explorer", true, Some(120), None).await.unwrap();
    repo.open_incident(
        EntityKind::Rpc,
        "nodereal",
        "https://aptos-mainnet.nodereal.io",
        Severity::Crit,
        "RPC unreachable or failing (consecutive failures).",
    )
    .await
    .unwrap();

    let server = TestServer::new(repo).await;
    let resp = server.get("/v1/status").await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();

    assert_eq!(body["recommended_provider"], "aptoslabs");
    let providers = body["rpc_providers"].as_array().unwrap();
    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0]["name"], "aptoslabs");
    assert_eq!(providers[0]["healthy"], true);
    assert_eq!(providers[0]["latency_ms"], 80);
    assert_eq!(providers[1]["healthy"], false);
    assert_eq!(providers[1]["last_error"], "timeout");
    assert!(providers[1].get("latency_ms").is_none());

    let dapps = body["dapps"].as_array().unwrap();
    assert_eq!(dapps[0]["name"], "aptos-explorer");
    assert_eq!(dapps[0]["healthy"], true);

    let incidents = body["open_incidents"].as_array().unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0]["entity_name"], "nodereal");
    assert_eq!(incidents[0]["severity"], "CRIT");

    server.cleanup();
}

#[tokio::test]
async fn incidents_list_filters_by_state() {
    let repo = create_test_repo().await;
    let first = repo
        .open_incident(EntityKind::Rpc, "a", "https://a", Severity::Crit, "a down")
        .await
        .unwrap();
    repo.open_incident(EntityKind::Rpc, "b", "https://b", Severity::Warn, "b slow")
        .await
        .unwrap();
    repo.close_incident(first, "a recovered").await.unwrap();

    let server = TestServer::new(repo).await;

    let body: serde_json::Value = server.get("/v1/incidents").await.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 2);

    let body: serde_json::Value =
        server.get("/v1/incidents?state=open").await.json().await.unwrap();
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["entity_name"], "b");
    assert!(rows[0].get("ended_at").is_none());

    let body: serde_json::Value =
        server.get("/v1/incidents?state=closed").await.json().await.unwrap();
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["summary"], "a recovered");
    assert!(rows[0]["ended_at"].is_string());

    server.cleanup();
}

#[tokio::test]
async fn incidents_list_rejects_unknown_state() {
    let server = TestServer::new(create_test_repo().await).await;

    let resp = server.get("/v1/incidents?state=weird").await;
    assert_eq!(resp.status(), 400);

    server.cleanup();
}

#[tokio::test]
async fn incident_detail_includes_updates() {
    let repo = create_test_repo().await;
    let id = repo
        .open_incident(EntityKind::Rpc, "a", "https://a", Severity::Crit, "a down")
        .await
        .unwrap();
    repo.add_incident_update(id, "a down").await.unwrap();

    let server = TestServer::new(repo).await;
    let resp = server.get(&format!("/v1/incidents/{id}")).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();

    assert_eq!(body["id"], id);
    assert_eq!(body["state"], "open");
    let updates = body["updates"].as_array().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["message"], "a down");

    server.cleanup();
}

#[tokio::test]
async fn incident_detail_unknown_id_is_404() {
    let server = TestServer::new(create_test_repo().await).await;

    let resp = server.get("/v1/incidents/4711").await;
    assert_eq!(resp.status(), 404);

    let resp = server.get("/v1/incidents/abc").await;
    assert_eq!(resp.status(), 400);

    server.cleanup();
}

#[tokio::test]
async fn report_roundtrip_truncates_and_redacts() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo.clone()).await;

    let resp = server
        .client
        .post(server.url("/v1/report"))
        .json(&serde_json::json!({
            "issue_type": "tx_failed",
            "wallet": "0xabc",
            "device": "ios",
            "region": "eu",
            "description": "d".repeat(3000),
            "url": "https://app.example",
            "tx_hash": "0xdeadbeef",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["id"].as_i64().unwrap() > 0);

    // Stored description is truncated to exactly its maximum.
    let stored = repo.list_reports(10).await.unwrap();
    assert_eq!(stored[0].description.len(), 2048);
    assert_eq!(stored[0].wallet, "0xabc");

    // The public list withholds wallet, url, tx_hash, and user_agent.
    let body: serde_json::Value = server.get("/v1/reports").await.json().await.unwrap();
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["issue_type"], "tx_failed");
    assert_eq!(rows[0]["device"], "ios");
    assert!(rows[0].get("wallet").is_none());
    assert!(rows[0].get("url").is_none());
    assert!(rows[0].get("tx_hash").is_none());
    assert!(rows[0].get("user_agent").is_none());

    server.cleanup();
}

#[tokio::test]
async fn report_takes_user_agent_from_header() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo.clone()).await;

    let resp = server
        .client
        .post(server.url("/v1/report"))
        .header("user-agent", "guardian-test/1.0")
        .json(&serde_json::json!({
            "issue_type": "tx_failed",
            "user_agent": "spoofed"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let stored = repo.list_reports(10).await.unwrap();
    assert_eq!(stored[0].user_agent, "guardian-test/1.0");

    server.cleanup();
}

#[tokio::test]
async fn report_requires_issue_type_and_valid_json() {
    let server = TestServer::new(create_test_repo().await).await;

    let resp = server
        .client
        .post(server.url("/v1/report"))
        .json(&serde_json::json!({ "description": "no issue type" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = server
        .client
        .post(server.url("/v1/report"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    server.cleanup();
}

#[tokio::test]
async fn wrong_methods_are_rejected() {
    let server = TestServer::new(create_test_repo().await).await;

    let resp = server.client.post(server.url("/v1/status")).send().await.unwrap();
    assert_eq!(resp.status(), 405);

    let resp = server.get("/v1/report").await;
    assert_eq!(resp.status(), 405);

    server.cleanup();
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    // Submitting a report bumps the counter served at /metrics.
    let resp = server
        .client
        .post(server.url("/v1/report"))
        .json(&serde_json::json!({ "issue_type": "tx_failed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = server.get("/metrics").await;
    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    assert!(text.contains("aptos_guardian_reports_total 1"));

    server.cleanup();
}

#[tokio::test]
async fn engine_transitions_are_visible_through_the_api() {
    let repo = create_test_repo().await;
    let engine_repo: Arc<dyn GuardianRepository> = repo.clone();
    let engine = IncidentEngine::new(engine_repo, Thresholds::default());

    for _ in 0..3 {
        repo.insert_check(EntityKind::Rpc, "aptoslabs", false, None, Some(ErrorCategory::Dns))
            .await
            .unwrap();
    }
    engine
        .process_rpc_result("aptoslabs", "https://fullnode.mainnet.aptoslabs.com", false, 0)
        .await
        .unwrap();
    assert!(repo.has_open_incident(EntityKind::Rpc, "aptoslabs").await.unwrap().is_some());

    let server = TestServer::new(repo).await;
    let body: serde_json::Value =
        server.get("/v1/incidents?state=open").await.json().await.unwrap();
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["entity_name"], "aptoslabs");
    assert_eq!(rows[0]["summary"], "RPC unreachable or failing (consecutive failures).");

    let list: serde_json::Value = server.get("/v1/status").await.json().await.unwrap();
    assert_eq!(list["open_incidents"].as_array().unwrap().len(), 1);

    server.cleanup();
}
