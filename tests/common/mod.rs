// Not every test binary uses every helper.
#![allow(dead_code)]

use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

use gimmejson::api::routes::build_app;
use gimmejson::model::EndpointDefinition;
use gimmejson::store::MemoryStore;

// Test client wrapper for making API calls
pub struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    pub async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    pub async fn put(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .put(format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    pub async fn patch(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .patch(format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    pub async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .delete(format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    pub async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .send()
            .await
    }
}

/// Serve the app (management routes plus routes materialized from the given
/// definitions) on an ephemeral local port and return a client against it.
pub async fn spawn_app(store: Arc<MemoryStore>, definitions: &[EndpointDefinition]) -> TestClient {
    let app = build_app(store, definitions).expect("failed to build app");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });
    TestClient::new(format!("http://{}", addr))
}

pub async fn spawn_empty_app() -> TestClient {
    spawn_app(Arc::new(MemoryStore::new()), &[]).await
}
