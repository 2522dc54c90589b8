//! Bridge controller: one bridged request from start to finish.
//!
//! # Data Flow
//! ```text
//! startup:  Bootstrapper::initialise → Bootstrapper::engine → Bridge (Ready)
//!
//! request:  HostExchange
//!     → translate (InnerRequest)
//!     → Engine::handle_request (the only suspension point)
//!     → associate (host side of the link)
//!     → complete (apply, or pass through to next host stage)
//! ```
//!
//! # Design Decisions
//! - The engine handle is created once and only read afterwards, so the
//!   bridge is shared across tasks without locking
//! - The host abort signal goes straight to the engine; no timeouts or
//!   retries here

use axum::{body::Body, http::Response};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::bridge::apply::{complete, Completion, PassThrough};
use crate::bridge::association::{associate, ContextLink};
use crate::bridge::translate::translate;
use crate::bridge::BridgeError;
use crate::config::BridgeConfig;
use crate::engine::{Bootstrapper, Dispatch, Engine, InnerContext, SwitchPolicy};
use crate::host::HostExchange;
use crate::observability::metrics;

/// Runtime options for a [`Bridge`].
#[derive(Clone)]
pub struct BridgeOptions {
    /// Copy the client certificate onto inner requests.
    pub enable_client_certificates: bool,
    /// Keep request bodies in memory regardless of size.
    pub disable_request_stream_switching: bool,
    /// Body size at which buffering moves to temporary storage.
    pub request_stream_switch_threshold: Option<u64>,
    /// Scheme for requests whose URI does not carry one.
    pub default_scheme: String,
    /// Chooses pass-through over applying the inner response.
    pub perform_pass_through: PassThrough,
}

impl BridgeOptions {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            enable_client_certificates: config.bridge.enable_client_certificates,
            disable_request_stream_switching: config.bridge.disable_request_stream_switching,
            request_stream_switch_threshold: config.bridge.request_stream_switch_threshold,
            default_scheme: config.listener.scheme.clone(),
            ..Self::default()
        }
    }

    pub fn with_pass_through<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&InnerContext) -> bool + Send + Sync + 'static,
    {
        self.perform_pass_through = Arc::new(predicate);
        self
    }

    pub fn switch_policy(&self) -> SwitchPolicy {
        SwitchPolicy {
            disabled: self.disable_request_stream_switching,
            threshold: self.request_stream_switch_threshold,
        }
    }
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            enable_client_certificates: false,
            disable_request_stream_switching: false,
            request_stream_switch_threshold: None,
            default_scheme: "http".to_string(),
            perform_pass_through: Arc::new(|_: &InnerContext| false),
        }
    }
}

impl fmt::Debug for BridgeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeOptions")
            .field("enable_client_certificates", &self.enable_client_certificates)
            .field(
                "disable_request_stream_switching",
                &self.disable_request_stream_switching,
            )
            .field(
                "request_stream_switch_threshold",
                &self.request_stream_switch_threshold,
            )
            .field("default_scheme", &self.default_scheme)
            .finish_non_exhaustive()
    }
}

/// Bridges host exchanges into an inner engine.
pub struct Bridge<E> {
    engine: E,
    options: BridgeOptions,
}

impl<E: Engine> Bridge<E> {
    /// Initialise the inner engine and take its handle.
    pub fn new<B>(mut bootstrapper: B, options: BridgeOptions) -> Result<Self, BridgeError>
    where
        B: Bootstrapper<Engine = E>,
    {
        bootstrapper.initialise().map_err(BridgeError::Bootstrap)?;
        let engine = bootstrapper.engine();

        tracing::info!(
            enable_client_certificates = options.enable_client_certificates,
            disable_request_stream_switching = options.disable_request_stream_switching,
            request_stream_switch_threshold = ?options.request_stream_switch_threshold,
            "Inner engine initialised"
        );

        Ok(Self { engine, options })
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run one exchange through the inner engine.
    ///
    /// `next` is the host's next stage, called only on pass-through.
    pub async fn invoke<N, Fut>(&self, exchange: HostExchange, next: N) -> Result<Response<Body>, BridgeError>
    where
        N: FnOnce(HostExchange) -> Fut + Send,
        Fut: Future<Output = Response<Body>> + Send,
    {
        let start = Instant::now();
        let exchange_id = exchange.id();

        let result = self.run(exchange, next).await;
        match &result {
            Ok(completion) => {
                tracing::debug!(
                    exchange_id = %exchange_id,
                    outcome = completion.outcome(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Exchange completed"
                );
                metrics::record_exchange(completion.outcome(), start);
            }
            Err(e) => {
                tracing::warn!(exchange_id = %exchange_id, error = %e, "Exchange failed");
                metrics::record_exchange("error", start);
            }
        }

        result.map(Completion::into_response)
    }

    async fn run<N, Fut>(&self, mut exchange: HostExchange, next: N) -> Result<Completion, BridgeError>
    where
        N: FnOnce(HostExchange) -> Fut + Send,
        Fut: Future<Output = Response<Body>> + Send,
    {
        let request = translate(&mut exchange, &self.options)?;
        tracing::debug!(
            exchange_id = %exchange.id(),
            method = %request.method(),
            url = %request.url(),
            "Dispatching to inner engine"
        );

        let link = ContextLink::new(exchange.id(), exchange.user.clone());
        let dispatch = Dispatch::new(request, link);
        let context = self
            .engine
            .handle_request(dispatch, exchange.aborted().clone())
            .await
            .map_err(BridgeError::Engine)?;

        associate(&mut exchange, &context);

        complete(context, exchange, self.options.perform_pass_through.as_ref(), next).await
    }
}
