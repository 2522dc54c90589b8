//! The bridge between the host pipeline and the inner engine.
//!
//! # Data Flow
//! ```text
//! HostExchange
//!     → translate.rs   (host request → InnerRequest; url.rs rebuilds the URL)
//!     → controller.rs  (dispatch to Engine, await InnerContext)
//!     → association.rs (host ↔ inner lookup)
//!     → apply.rs       (InnerResponse → host response, or next host stage)
//! ```

pub mod apply;
pub mod association;
pub mod controller;
pub mod error;
pub mod translate;
pub mod url;

pub use apply::{Completion, PassThrough, PassedThroughContext};
pub use association::{associate, lookup_host, lookup_inner};
pub use controller::{Bridge, BridgeOptions};
pub use error::BridgeError;
