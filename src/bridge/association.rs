//! Reciprocal lookup between a host exchange and its inner context.
//!
//! Each side stores only the other side's identifier in its own item bag;
//! neither owns or keeps alive the other.

use crate::engine::{ContextId, InnerContext};
use crate::host::{ExchangeId, HostExchange};
use crate::principal::Principal;

/// Inner-context item key under which the host exchange id is stored.
pub const HOST_EXCHANGE_KEY: &str = "bridge.host_exchange";

/// Host item recording the inner context produced for the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerContextHandle(pub ContextId);

/// The host-side facts an inner context is created with.
#[derive(Debug, Clone)]
pub struct ContextLink {
    exchange: ExchangeId,
    principal: Option<Principal>,
}

impl ContextLink {
    pub fn new(exchange: ExchangeId, principal: Option<Principal>) -> Self {
        Self {
            exchange,
            principal,
        }
    }

    pub(crate) fn attach(self, context: &mut InnerContext) {
        context.current_user = self.principal;
        context.items_mut().insert(HOST_EXCHANGE_KEY, self.exchange);
    }
}

/// Record `context` on the host side of the link.
///
/// The inner side is written once, by
/// [`Dispatch::into_context`](crate::engine::Dispatch::into_context); the
/// engine's later changes to the context, the current user included, are
/// left alone.
pub fn associate(exchange: &mut HostExchange, context: &InnerContext) {
    exchange.items_mut().insert(InnerContextHandle(context.id()));
}

/// Inner context bridged for this exchange, if any.
pub fn lookup_inner(exchange: &HostExchange) -> Option<ContextId> {
    exchange
        .items()
        .get::<InnerContextHandle>()
        .map(|handle| handle.0)
}

/// Host exchange this context was bridged from, if any.
pub fn lookup_host(context: &InnerContext) -> Option<ExchangeId> {
    context.items().get::<ExchangeId>(HOST_EXCHANGE_KEY).copied()
}
