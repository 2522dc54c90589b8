//! Inner application pipeline model.
//!
//! # Data Flow
//! ```text
//! Bootstrapper::initialise (once, at startup)
//!     → Bootstrapper::engine → Engine handle (process lifetime)
//!
//! per request:
//!     Dispatch { InnerRequest, ContextLink }
//!     → Engine::handle_request
//!         → Dispatch::into_context (context linked to its host exchange)
//!         → routing / handlers fill InnerContext::response
//!     → InnerContext returned to the bridge
//! ```
//!
//! Nothing in this module knows about axum or the host exchange; the link
//! back to the host is an opaque handle.

pub mod context;
pub mod echo;
pub mod headers;
pub mod request;
pub mod response;
pub mod stream;
pub mod url;

use std::future::Future;

use crate::bridge::association::ContextLink;
use crate::lifecycle::AbortSignal;

pub use context::{ContextId, ContextItems, InnerContext};
pub use headers::Headers;
pub use request::{Certificate, InnerRequest};
pub use response::{Contents, Cookie, InnerResponse, SameSite};
pub use stream::{RequestStream, SwitchPolicy};
pub use url::Url;

/// Opaque error raised by an inner engine or its bootstrapper.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// Handle to an initialised inner engine.
pub trait Engine: Send + Sync + 'static {
    /// Process one request to completion.
    ///
    /// The engine must build its context with [`Dispatch::into_context`].
    /// `aborted` fires if the host abandons the exchange; honouring it is up
    /// to the engine.
    fn handle_request(
        &self,
        dispatch: Dispatch,
        aborted: AbortSignal,
    ) -> impl Future<Output = Result<InnerContext, EngineError>> + Send;
}

/// Builds the inner engine at startup.
pub trait Bootstrapper: Send + 'static {
    type Engine: Engine;

    /// One-time initialisation.
    fn initialise(&mut self) -> Result<(), EngineError>;

    /// The engine handle, valid after [`initialise`](Bootstrapper::initialise).
    fn engine(&self) -> Self::Engine;
}

/// One request on its way into the engine.
#[derive(Debug)]
pub struct Dispatch {
    request: InnerRequest,
    link: ContextLink,
}

impl Dispatch {
    pub fn new(request: InnerRequest, link: ContextLink) -> Self {
        Self { request, link }
    }

    pub fn request(&self) -> &InnerRequest {
        &self.request
    }

    /// Create the context for this request.
    ///
    /// The current user and the host handle are in place before any engine
    /// code can observe the context.
    pub fn into_context(self) -> InnerContext {
        let mut context = InnerContext::new(self.request);
        self.link.attach(&mut context);
        context
    }
}
