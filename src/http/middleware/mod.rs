pub mod bridge;

pub use bridge::bridge_middleware;
