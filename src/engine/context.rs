//! Inner processing context.
//!
//! # Responsibilities
//! - Hold the request, the current user and the response for one dispatch
//! - Carry a string-keyed item bag shared by engine stages
//! - Release per-request resources on disposal
//!
//! # Design Decisions
//! - Only [`Dispatch::into_context`](crate::engine::Dispatch::into_context)
//!   creates contexts, so the link back to the host is always present
//! - `dispose` consumes the context; a second disposal cannot compile

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::request::InnerRequest;
use crate::engine::response::InnerResponse;
use crate::principal::Principal;

static CONTEXT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an inner context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub fn new() -> Self {
        Self(CONTEXT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// String-keyed bag of arbitrary values.
#[derive(Default)]
pub struct ContextItems {
    items: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl ContextItems {
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.items.insert(key.into(), Box::new(value));
    }

    /// Value under `key`, if present and of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.items.get(key).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.items.remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for ContextItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.keys()).finish()
    }
}

/// State of one request inside the inner engine.
#[derive(Debug)]
pub struct InnerContext {
    id: ContextId,
    request: InnerRequest,
    pub current_user: Option<Principal>,
    pub response: InnerResponse,
    items: ContextItems,
}

impl InnerContext {
    pub(crate) fn new(request: InnerRequest) -> Self {
        Self {
            id: ContextId::new(),
            request,
            current_user: None,
            response: InnerResponse::default(),
            items: ContextItems::default(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn request(&self) -> &InnerRequest {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut InnerRequest {
        &mut self.request
    }

    pub fn items(&self) -> &ContextItems {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut ContextItems {
        &mut self.items
    }

    /// Release the request body storage and every item.
    pub fn dispose(self) {
        tracing::trace!(context_id = %self.id, "Inner context disposed");
        drop(self);
    }
}
