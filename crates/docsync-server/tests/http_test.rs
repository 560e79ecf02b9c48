//! HTTP status mapping of the ingestion endpoint.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::{json, Value};

use common::{at, server_config, FaultyStore, RunningServer, SCOPE, TOKEN};
use docsync_core::content_hash;
use docsync_core::models::{
    BatchResponse, ErrorResponse, ItemStatus, PROTOCOL_HEADER, SYNC_BATCHES_PATH,
};
use docsync_server::HEALTH_PATH;
use docsync_storage::StorageEngine;

fn envelope(scope: &str, items: Vec<Value>) -> Value {
    json!({
        "sourceScopeId": scope,
        "agentId": "test-agent",
        "sentAt": at(0),
        "items": items,
    })
}

fn item(id: &str) -> Value {
    json!({
        "op": "upsert",
        "externalId": id,
        "contentMarkdown": "body",
        "contentHash": content_hash("body"),
        "updatedAtSource": at(10),
    })
}

async fn post(server: &RunningServer, token: Option<&str>, body: &Value) -> reqwest::Response {
    let mut request = reqwest::Client::new()
        .post(server.url(SYNC_BATCHES_PATH))
        .json(body);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    request.send().await.unwrap()
}

async fn start_default() -> RunningServer {
    RunningServer::start(
        &server_config(),
        Arc::new(StorageEngine::open_in_memory().unwrap()),
    )
    .await
}

async fn error_code(response: reqwest::Response) -> String {
    response.json::<ErrorResponse>().await.unwrap().code
}

// ─── Success ──────────────────────────────────────────────

#[tokio::test]
async fn health_is_open() {
    let server = start_default().await;
    let response = reqwest::get(server.url(HEALTH_PATH)).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    server.stop().await;
}

#[tokio::test]
async fn valid_batch_returns_per_item_results() {
    let server = start_default().await;
    let body = envelope(SCOPE, vec![item("vault::a.md"), json!({ "op": "upsert" })]);
    let response = post(&server, Some(TOKEN), &body).await;
    assert_eq!(response.status(), 200);

    let results: BatchResponse = response.json().await.unwrap();
    assert_eq!(results.accepted, 1);
    assert_eq!(results.rejected, 1);
    assert_eq!(results.item_results[0].status, ItemStatus::Accepted);
    assert_eq!(results.item_results[1].status, ItemStatus::Rejected);
    server.stop().await;
}

// ─── Refusals ─────────────────────────────────────────────

#[tokio::test]
async fn missing_or_unknown_credential_is_unauthorized() {
    let server = start_default().await;
    let body = envelope(SCOPE, vec![item("vault::a.md")]);

    let response = post(&server, None, &body).await;
    assert_eq!(response.status(), 401);
    assert_eq!(error_code(response).await, "UNAUTHORIZED");

    assert_eq!(post(&server, Some("nope"), &body).await.status(), 401);
    server.stop().await;
}

#[tokio::test]
async fn credential_for_another_scope_is_unauthorized() {
    let server = start_default().await;
    let body = envelope(SCOPE, vec![item("vault::a.md")]);
    assert_eq!(post(&server, Some("other-token"), &body).await.status(), 401);
    server.stop().await;
}

#[tokio::test]
async fn unknown_scope_is_not_found() {
    let server = start_default().await;
    let body = envelope("nowhere", vec![item("nowhere::a.md")]);
    let response = post(&server, Some(TOKEN), &body).await;
    assert_eq!(response.status(), 404);
    assert_eq!(error_code(response).await, "UNKNOWN_SCOPE");
    server.stop().await;
}

#[tokio::test]
async fn invalid_envelopes_are_bad_requests() {
    let mut config = server_config();
    config.server.max_items_per_batch = 2;
    let server = RunningServer::start(&config, Arc::new(StorageEngine::open_in_memory().unwrap())).await;

    let empty = envelope(SCOPE, vec![]);
    let too_many = envelope(SCOPE, vec![item("vault::a.md"), item("vault::b.md"), item("vault::c.md")]);
    let missing_agent = json!({ "sourceScopeId": SCOPE, "sentAt": at(0), "items": [item("vault::a.md")] });
    for body in [empty, too_many, missing_agent] {
        let response = post(&server, Some(TOKEN), &body).await;
        assert_eq!(response.status(), 400, "body: {body}");
        assert_eq!(error_code(response).await, "INVALID_BATCH");
    }

    let garbage = reqwest::Client::new()
        .post(server.url(SYNC_BATCHES_PATH))
        .bearer_auth(TOKEN)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), 400);
    server.stop().await;
}

#[tokio::test]
async fn unsupported_protocol_version_is_a_bad_request() {
    let server = start_default().await;
    let response = reqwest::Client::new()
        .post(server.url(SYNC_BATCHES_PATH))
        .bearer_auth(TOKEN)
        .header(PROTOCOL_HEADER, "2.0")
        .json(&envelope(SCOPE, vec![item("vault::a.md")]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    server.stop().await;
}

// ─── Backpressure and infrastructure failures ─────────────

#[tokio::test]
async fn saturated_server_answers_busy_with_retry_after() {
    let mut config = server_config();
    config.server.max_in_flight_batches = 1;
    config.server.busy_retry_after_secs = 9;
    let store = Arc::new(FaultyStore::new());
    let release = store.hold();
    let server = RunningServer::start(&config, store.clone()).await;

    let client = reqwest::Client::new();
    let first = {
        let request = client
            .post(server.url(SYNC_BATCHES_PATH))
            .bearer_auth(TOKEN)
            .json(&envelope(SCOPE, vec![item("vault::a.md")]));
        tokio::spawn(async move { request.send().await.unwrap() })
    };
    for _ in 0..400 {
        if store.entered.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(store.entered.load(Ordering::SeqCst));

    let busy = post(&server, Some(TOKEN), &envelope(SCOPE, vec![item("vault::b.md")])).await;
    assert_eq!(busy.status(), 503);
    assert_eq!(busy.headers()["retry-after"], "9");
    assert_eq!(error_code(busy).await, "RATE_LIMITED");

    release.send(()).unwrap();
    assert_eq!(first.await.unwrap().status(), 200);
    server.stop().await;
}

#[tokio::test]
async fn storage_outage_is_a_server_error() {
    let store = Arc::new(FaultyStore::new());
    store.fail_cursor();
    let server = RunningServer::start(&server_config(), store).await;

    let response = post(&server, Some(TOKEN), &envelope(SCOPE, vec![item("vault::a.md")])).await;
    assert_eq!(response.status(), 500);
    assert_eq!(error_code(response).await, "STORAGE_ERROR");
    server.stop().await;
}
