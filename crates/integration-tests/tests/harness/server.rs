//! Test server wrapper that starts Switchboard on a random port

use std::net::SocketAddr;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use switchboard_config::Config;
use switchboard_server::Server;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server with the given configuration
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let server = Server::new(config);
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::new();

        Ok(Self { addr, shutdown, client })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Post a chat message to the streaming route
    pub async fn chat(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/chat"))
            .json(body)
            .send()
            .await
            .expect("chat request")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Collect the JSON payload of every SSE event in a response
pub async fn sse_payloads(response: reqwest::Response) -> Vec<serde_json::Value> {
    let mut events = response.bytes_stream().eventsource();
    let mut payloads = Vec::new();

    while let Some(event) = events.next().await {
        let event = event.expect("well-formed SSE");
        if event.data.is_empty() {
            continue;
        }
        payloads.push(serde_json::from_str(&event.data).expect("JSON event data"));
    }

    payloads
}
