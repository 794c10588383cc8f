//! Handler implementations keyed by descriptor.
//!
//! A [`HandlerTable`] pairs each [`HandlerDescriptor`] with the closure that
//! implements it and the [`RoutingKey`] it is mapped under. It registers the
//! mappings with a [`Router`] and serves as the [`HandlerInvoker`] for the
//! [`MethodHandlerAdapter`](crate::dispatcher::MethodHandlerAdapter).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{info, warn};

use crate::config::RouteTable;
use crate::dispatcher::HandlerInvoker;
use crate::error::MappingError;
use crate::handler::{HandlerDescriptor, ReturnValue};
use crate::router::{Router, RoutingKey};
use crate::server::{RequestContext, ServerRequest, ServerResponse};

/// A handler method implementation.
pub type HandlerFn = Arc<
    dyn Fn(&ServerRequest, &RequestContext, &mut ServerResponse) -> anyhow::Result<Option<ReturnValue>>
        + Send
        + Sync,
>;

/// Descriptor to implementation table.
#[derive(Default, Clone)]
pub struct HandlerTable {
    mappings: Vec<(RoutingKey, HandlerDescriptor)>,
    handlers: HashMap<HandlerDescriptor, HandlerFn>,
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("mappings", &self.mappings.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl HandlerTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `key` to `descriptor` and implement it with `handler`.
    ///
    /// A descriptor may be mapped under several keys; the last implementation
    /// given for it wins.
    pub fn define<F>(&mut self, descriptor: HandlerDescriptor, key: RoutingKey, handler: F) -> &mut Self
    where
        F: Fn(&ServerRequest, &RequestContext, &mut ServerResponse) -> anyhow::Result<Option<ReturnValue>>
            + Send
            + Sync
            + 'static,
    {
        if self.handlers.insert(descriptor.clone(), Arc::new(handler)).is_some() {
            warn!(handler = %descriptor, "Replaced handler implementation");
        }
        self.mappings.push((key, descriptor));
        self
    }

    /// Implement every route of `table` with `factory` and register the mappings
    /// with `router`.
    ///
    /// # Errors
    ///
    /// Invalid route definitions or ambiguous mappings.
    pub fn from_route_table<F>(table: &RouteTable, router: &Router, factory: F) -> anyhow::Result<Self>
    where
        F: Fn(&HandlerDescriptor) -> HandlerFn,
    {
        let mut this = Self::new();
        for (descriptor, key) in table.register(router)? {
            let handler = factory(&descriptor);
            this.handlers.insert(descriptor.clone(), handler);
            this.mappings.push((key, descriptor));
        }
        Ok(this)
    }

    /// Register every defined mapping with `router`. Returns how many were new.
    ///
    /// # Errors
    ///
    /// Stops at the first ambiguous mapping.
    pub fn register_all(&self, router: &Router) -> Result<usize, MappingError> {
        let mut added = 0;
        for (key, descriptor) in &self.mappings {
            if router.register_handler(key.clone(), descriptor.clone())? {
                added += 1;
            }
        }
        info!(
            handlers_count = self.handlers.len(),
            mappings_count = self.mappings.len(),
            added,
            "Handler table registered"
        );
        Ok(added)
    }

    #[must_use]
    pub fn get(&self, descriptor: &HandlerDescriptor) -> Option<&HandlerFn> {
        self.handlers.get(descriptor)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl HandlerInvoker for HandlerTable {
    fn invoke(
        &self,
        handler: &HandlerDescriptor,
        request: &ServerRequest,
        ctx: &RequestContext,
        response: &mut ServerResponse,
    ) -> anyhow::Result<Option<ReturnValue>> {
        let implementation = self
            .handlers
            .get(handler)
            .ok_or_else(|| anyhow!("no implementation registered for handler '{handler}'"))?;
        implementation(request, ctx, response)
    }
}
