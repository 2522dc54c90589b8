//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the host's own router with the bridge middleware
//! - Wire up tracing
//! - Bind server to listener with peer addresses available to handlers
//! - Graceful shutdown

use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::engine::Engine;
use crate::http::middleware::bridge_middleware;
use crate::lifecycle::signals::shutdown_signal;

/// HTTP server hosting the bridge.
pub struct HttpServer {
    router: Router,
    config: BridgeConfig,
}

impl HttpServer {
    /// Create a server whose requests pass through `bridge` before reaching
    /// `next_stage`.
    pub fn new<E: Engine>(config: BridgeConfig, bridge: Arc<Bridge<E>>, next_stage: Router) -> Self {
        let router = Self::build_router(bridge, next_stage);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<E: Engine>(bridge: Arc<Bridge<E>>, next_stage: Router) -> Router {
        next_stage
            .layer(from_fn_with_state(bridge, bridge_middleware::<E>))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until Ctrl+C or SIGTERM.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

/// Host stage reached when the inner engine passes an exchange through and
/// nothing else handles it.
pub fn host_fallback() -> Router {
    Router::new().fallback(|| async { (StatusCode::NOT_FOUND, "Not handled by host").into_response() })
}
