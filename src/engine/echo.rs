//! Built-in inner engine that reports what it received.
//!
//! Serves as the default engine of the `pipeline-bridge` binary and as a
//! fixture for end-to-end tests. Paths under `/skip` ask the bridge to pass
//! the exchange through to the next host stage.

use serde::Serialize;

use crate::engine::{
    Bootstrapper, Cookie, Dispatch, Engine, EngineError, InnerContext, InnerResponse,
};
use crate::lifecycle::AbortSignal;

/// Context item set when the engine declines to answer.
pub const PASS_THROUGH_ITEM: &str = "echo.pass_through";

const SKIP_PREFIX: &str = "/skip";

/// Pass-through predicate for [`BridgeOptions`](crate::bridge::BridgeOptions).
pub fn pass_through_requested(context: &InnerContext) -> bool {
    context
        .items()
        .get::<bool>(PASS_THROUGH_ITEM)
        .copied()
        .unwrap_or(false)
}

#[derive(Debug, Serialize)]
struct EchoReport<'a> {
    method: &'a str,
    url: String,
    protocol: &'a str,
    remote_address: &'a str,
    user: Option<&'a str>,
    certificate_length: Option<usize>,
    headers: Vec<(&'a str, &'a [String])>,
    body_length: usize,
    in_memory: bool,
}

/// Handle to the echo engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoEngine;

impl Engine for EchoEngine {
    async fn handle_request(
        &self,
        dispatch: Dispatch,
        mut aborted: AbortSignal,
    ) -> Result<InnerContext, EngineError> {
        let mut context = dispatch.into_context();
        let context_id = context.id();

        if context.request().url().path.starts_with(SKIP_PREFIX) {
            context.items_mut().insert(PASS_THROUGH_ITEM, true);
            context.response = InnerResponse::new(404).with_reason_phrase("Not Found");
            return Ok(context);
        }

        let body = tokio::select! {
            body = context.request_mut().body_mut().read_to_end() => body?,
            _ = aborted.aborted() => {
                tracing::debug!(%context_id, "Echo aborted while reading body");
                return Err("request aborted by host".into());
            }
        };

        let request = context.request();
        let report = EchoReport {
            method: request.method(),
            url: request.url().to_string(),
            protocol: request.protocol_version(),
            remote_address: request.user_host_address(),
            user: context.current_user.as_ref().map(|user| user.name()),
            certificate_length: request.certificate().map(|cert| cert.der().len()),
            headers: request.headers().iter().collect(),
            body_length: body.len(),
            in_memory: request.body().is_in_memory(),
        };
        let json = serde_json::to_vec(&report)?;

        context.response = InnerResponse::new(200)
            .with_reason_phrase("OK")
            .with_content_type("application/json")
            .with_cookie(Cookie::new("bridged", "1"))
            .with_body(json);
        Ok(context)
    }
}

/// Bootstrapper for [`EchoEngine`].
#[derive(Debug, Default)]
pub struct EchoBootstrapper {
    initialised: bool,
}

impl Bootstrapper for EchoBootstrapper {
    type Engine = EchoEngine;

    fn initialise(&mut self) -> Result<(), EngineError> {
        self.initialised = true;
        tracing::info!("Echo engine initialised");
        Ok(())
    }

    fn engine(&self) -> EchoEngine {
        EchoEngine
    }
}
