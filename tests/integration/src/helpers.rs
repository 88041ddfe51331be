//! Test helper utilities for integration tests

use gateway_server::{AppState, Server, ServerConfig};
use once_cell::sync::Lazy;
use reqwest::{Client, Response};
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// A gateway listening on an ephemeral local port
pub struct TestServer {
    /// The server address
    pub addr: SocketAddr,
    /// HTTP client for making requests
    pub client: Client,
    /// Base URL for the server
    pub base_url: String,
    /// State shared with the running server
    pub state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Serve `state` until [`TestServer::shutdown`] is called or the server is dropped
    pub async fn start(state: AppState) -> Self {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let config = ServerConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
        };
        let server = Server::new(config, state.clone());
        let handle = tokio::spawn(async move {
            let _ = server
                .serve(listener, async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            client: Client::new(),
            base_url: format!("http://{addr}"),
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Absolute URL for a gateway path
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a path
    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// GET a path with an `x-vendor` header
    pub async fn get_from_vendor(&self, path: &str, vendor: &str) -> Response {
        self.client
            .get(self.url(path))
            .header("x-vendor", vendor)
            .send()
            .await
            .unwrap()
    }

    /// POST a JSON body
    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client.post(self.url(path)).json(body).send().await.unwrap()
    }

    /// POST a JSON body with extra headers
    pub async fn post_json_with_headers(&self, path: &str, body: &Value, headers: &[(&str, &str)]) -> Response {
        let mut request = self.client.post(self.url(path)).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request.send().await.unwrap()
    }

    /// Stop the server and wait for the background tasks to finish
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Assert a response status
pub fn assert_status(response: &Response, expected: u16) {
    assert_eq!(
        response.status().as_u16(),
        expected,
        "unexpected status for {}",
        response.url()
    );
}

/// Read a response body as JSON
pub async fn response_json(response: Response) -> Value {
    response.json().await.unwrap()
}

/// Model ids of an OpenAI model listing
pub fn model_ids(listing: &Value) -> Vec<String> {
    listing["data"]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m["id"].as_str().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default()
}
