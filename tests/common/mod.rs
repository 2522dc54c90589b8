//! Shared utilities for integration testing.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use pipeline_bridge::bridge::{Bridge, BridgeOptions};
use pipeline_bridge::config::BridgeConfig;
use pipeline_bridge::engine::Bootstrapper;
use pipeline_bridge::http::HttpServer;

/// A bridge server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Serve an already layered router with peer addresses available.
#[allow(dead_code)]
pub async fn start_router(router: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    let app = router.into_make_service_with_connect_info::<SocketAddr>();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        addr,
        shutdown: Some(tx),
    }
}

/// Start a server bridging into the engine built by `bootstrapper`.
pub async fn start_bridge<B: Bootstrapper>(
    config: BridgeConfig,
    bootstrapper: B,
    options: BridgeOptions,
    next_stage: Router,
) -> TestServer {
    let bridge = Arc::new(Bridge::new(bootstrapper, options).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    let server = HttpServer::new(config, bridge, next_stage);
    tokio::spawn(async move {
        let _ = server
            .run_until(listener, async {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        addr,
        shutdown: Some(tx),
    }
}
