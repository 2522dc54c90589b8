//! Bridge middleware.
//! Runs every host request through the inner engine before the rest of the router.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::bridge::Bridge;
use crate::engine::Engine;
use crate::host::HostExchange;
use crate::lifecycle::abort_pair;

pub async fn bridge_middleware<E: Engine>(
    State(bridge): State<Arc<Bridge<E>>>,
    request: Request,
    next: Next,
) -> Response {
    // Dropping this future before the engine finishes trips the guard.
    let (guard, aborted) = abort_pair();
    let exchange = HostExchange::from_request(request, &bridge.options().default_scheme, aborted);

    let result = bridge
        .invoke(exchange, move |exchange| next.run(exchange.into_request()))
        .await;
    guard.disarm();

    match result {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
