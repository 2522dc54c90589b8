//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Process (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown of the host server
//!
//! Exchange (abort.rs):
//!     host drops exchange early → AbortGuard fires → AbortSignal observed
//!     by the inner engine
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative; nothing is forcibly interrupted
//! - No timeouts or retries at this layer

pub mod abort;
pub mod signals;

pub use abort::{abort_pair, AbortGuard, AbortSignal};
