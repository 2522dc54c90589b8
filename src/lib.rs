//! Pipeline bridge library.
//!
//! Runs requests received by an axum host through an inner request engine
//! and writes the engine's response back, or hands the exchange on to the
//! host's next stage.

pub mod bridge;
pub mod config;
pub mod engine;
pub mod host;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod principal;

pub use bridge::{Bridge, BridgeError, BridgeOptions};
pub use config::BridgeConfig;
pub use engine::{Bootstrapper, Engine, InnerContext};
pub use host::HostExchange;
pub use http::HttpServer;
pub use principal::Principal;
