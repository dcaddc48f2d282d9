//! HTTP surface of Switchboard
//!
//! Serves the chat routes backed by the LLM gateway, the settings routes used
//! by the dashboard, and a health check.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod chat;
mod cors;
mod error;
mod health;
mod settings;
mod state;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use switchboard_config::Config;
use tower_http::trace::TraceLayer;

pub use chat::ChatRequest;
pub use error::ApiError;
pub use state::{AppState, InFlight};
pub use store::{ConversationStore, InMemoryStore};

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server with an in-memory conversation store
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Arc::new(InMemoryStore::new()))
    }

    /// Build the server around an external conversation store
    pub fn with_store(config: Config, store: Arc<dyn ConversationStore>) -> Self {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));

        let state = AppState::new(config.llm, store);

        let mut app = Router::new()
            .route("/api/chat", post(chat::chat_stream))
            .route("/api/chat/complete", post(chat::chat_complete))
            .route("/api/chat/{conversation_id}", delete(chat::chat_cancel))
            .route(
                "/api/settings/llm",
                get(settings::get_settings).put(settings::update_settings),
            )
            .route("/api/providers", get(settings::list_providers))
            .with_state(state);

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, get(health::health_handler));
        }

        app = app.layer(TraceLayer::new_for_http());

        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Self {
            router: app,
            listen_address,
        }
    }

    /// Get the configured listen address
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
