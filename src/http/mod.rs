//! HTTP host subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, ConnectInfo, tracing)
//!     → middleware/bridge.rs (HostExchange → Bridge::invoke)
//!     → inner response, or the next host stage on pass-through
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;

pub use middleware::bridge_middleware;
pub use server::{host_fallback, HttpServer};
