//! HTTP API tests against a server bound to an ephemeral port.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use assist_harness::models::{Document, DocumentMetadata};
use assist_harness::retriever::Retriever;
use assist_harness::server::{serve, AppState};
use assist_harness::traits::{Connector, ConnectorRegistry};
use assist_harness_core::cache::{CacheConfig, ResponseCache};
use assist_harness_core::chunk::ChunkerConfig;
use async_trait::async_trait;
use chrono::Duration;
use serde_json::{json, Value};

struct DocsConnector;

#[async_trait]
impl Connector for DocsConnector {
    fn name(&self) -> &str {
        "docs"
    }

    async fn scan(&self) -> Result<Vec<Document>> {
        Ok(vec![
            Document::new(
                "Install docker by running `apt install docker`. Docker lets you run containers.",
                DocumentMetadata::new("docs", "docs")
                    .with_title("Docker")
                    .with_url("https://example.com/docker"),
            ),
            Document::new(
                "Kubernetes operators reconcile cluster state continuously, every single day.",
                DocumentMetadata::new("docs", "docs").with_title("Operators"),
            ),
        ])
    }
}

async fn start_server() -> String {
    let mut connectors = ConnectorRegistry::new();
    connectors.register(DocsConnector);
    let state = AppState {
        retriever: Arc::new(Retriever::new(
            connectors,
            ChunkerConfig::default(),
            Duration::minutes(30),
            5,
        )),
        cache: Arc::new(Mutex::new(
            ResponseCache::new(CacheConfig::default()).unwrap(),
        )),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, state).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let resp = client.post(url).json(&body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let base = start_server().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_search_and_context() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let (status, body) = post(
        &client,
        format!("{}/search", base),
        json!({ "query": "operator" }),
    )
    .await;
    assert_eq!(status, 200);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["score"], 12);
    assert_eq!(results[0]["metadata"]["title"], "Operators");
    assert_eq!(results[0]["metadata"]["type"], "docs");

    let (status, body) = post(
        &client,
        format!("{}/context", base),
        json!({ "query": "docker install", "top_k": 1 }),
    )
    .await;
    assert_eq!(status, 200);
    let context = body["context"].as_str().unwrap();
    assert!(context.starts_with("### Docker\nSource: docs (https://example.com/docker)"));

    let (_, body) = post(
        &client,
        format!("{}/context", base),
        json!({ "query": "billing invoices" }),
    )
    .await;
    assert_eq!(body["context"], "");
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    let (status, body) = post(&client, format!("{}/search", base), json!({ "query": "  " })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_cache_store_and_lookup() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let (_, body) = post(
        &client,
        format!("{}/cache/lookup", base),
        json!({ "question": "How do I install CX Linux on Ubuntu?" }),
    )
    .await;
    assert_eq!(body["answer"], Value::Null);

    let (_, body) = post(
        &client,
        format!("{}/cache/store", base),
        json!({
            "question": "How do I install CX Linux on Ubuntu?",
            "answer": "Run the bootstrap script with curl and pipe it to bash."
        }),
    )
    .await;
    assert_eq!(body["stored"], true);

    let (_, body) = post(
        &client,
        format!("{}/cache/store", base),
        json!({ "question": "Why did it fail?", "answer": "An error occurred, please try again." }),
    )
    .await;
    assert_eq!(body["stored"], false);

    let (_, body) = post(
        &client,
        format!("{}/cache/lookup", base),
        json!({ "question": "how do i install cx linux on ubuntu" }),
    )
    .await;
    assert_eq!(
        body["answer"],
        "Run the bootstrap script with curl and pipe it to bash."
    );

    let stats: Value = reqwest::get(format!("{}/stats", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["cache"]["size"], 1);
    assert_eq!(stats["cache"]["total_hits"], 1);
}

#[tokio::test]
async fn test_refresh_endpoint() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let (status, body) = post(&client, format!("{}/refresh", base), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["index"]["total_chunks"], 2);
    assert_eq!(body["index"]["sources"]["docs"], 2);
    assert_eq!(body["sources_failed"], 0);

    let (status, body) = post(&client, format!("{}/refresh", base), json!({ "force": true })).await;
    assert_eq!(status, 200);
    assert_eq!(body["index"]["total_documents"], 2);
}

#[tokio::test]
async fn test_refresh_without_body() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/refresh", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["index"]["total_chunks"], 2);
    assert_eq!(body["sources_failed"], 0);
}
