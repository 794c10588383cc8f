//! Dispatcher core: mapping lookup, adapter selection and invocation.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use http::StatusCode;
use tracing::{debug, error, info, warn};

use super::adapter::{handler_failed, HandlerAdapter, ServiceHandler};
use crate::error::DispatchError;
use crate::handler::HandlerDescriptor;
use crate::server::{LookupPathResolver, RequestContext, ServerRequest, ServerResponse};

/// What a handler mapping resolved to.
#[derive(Clone)]
pub enum Handler {
    /// A handler method, invoked through a
    /// [`HandlerInvoker`](super::HandlerInvoker).
    Method(HandlerDescriptor),
    /// A handler that writes the response itself.
    Service(Arc<dyn ServiceHandler>),
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(descriptor) => write!(f, "{descriptor}"),
            Self::Service(service) => f.write_str(service.name()),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(descriptor) => f.debug_tuple("Method").field(&descriptor.to_string()).finish(),
            Self::Service(service) => f.debug_tuple("Service").field(&service.name()).finish(),
        }
    }
}

/// A resolved handler ready for an adapter.
#[derive(Debug, Clone)]
pub struct HandlerExecutionChain {
    handler: Handler,
}

impl HandlerExecutionChain {
    #[must_use]
    pub fn new(handler: Handler) -> Self {
        Self { handler }
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    #[must_use]
    pub fn into_handler(self) -> Handler {
        self.handler
    }
}

/// Resolves requests to handlers. Tried by the dispatcher in ascending `order()`.
pub trait HandlerMapping: Send + Sync {
    fn order(&self) -> i32 {
        i32::MAX
    }

    /// Label used in logs.
    fn name(&self) -> &'static str {
        "handler-mapping"
    }

    /// The chain for this request, or `None` to let the next mapping try.
    ///
    /// # Errors
    ///
    /// A request that matched but cannot be served (e.g. not acceptable).
    fn handler(
        &self,
        request: &ServerRequest,
        ctx: &mut RequestContext,
    ) -> Result<Option<HandlerExecutionChain>, DispatchError>;
}

/// Exact lookup path to [`ServiceHandler`] table, e.g. for `/health`.
pub struct StaticHandlerMapping {
    handlers: HashMap<String, Arc<dyn ServiceHandler>>,
    path_resolver: LookupPathResolver,
    order: i32,
}

impl Default for StaticHandlerMapping {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticHandlerMapping {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            path_resolver: LookupPathResolver::default(),
            order: i32::MAX,
        }
    }

    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_path_resolver(mut self, path_resolver: LookupPathResolver) -> Self {
        self.path_resolver = path_resolver;
        self
    }

    /// Map `path` to `handler`, replacing any previous entry.
    #[must_use]
    pub fn with_handler(mut self, path: &str, handler: Arc<dyn ServiceHandler>) -> Self {
        if let Some(previous) = self.handlers.insert(path.to_string(), handler) {
            warn!(path = %path, previous = %previous.name(), "Replaced static handler");
        }
        self
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

impl HandlerMapping for StaticHandlerMapping {
    fn order(&self) -> i32 {
        self.order
    }

    fn name(&self) -> &'static str {
        "static"
    }

    fn handler(
        &self,
        request: &ServerRequest,
        ctx: &mut RequestContext,
    ) -> Result<Option<HandlerExecutionChain>, DispatchError> {
        let lookup_path = self.path_resolver.lookup_path(request);
        let Some(handler) = self.handlers.get(&lookup_path) else {
            return Ok(None);
        };
        ctx.set_lookup_path(lookup_path);
        Ok(Some(HandlerExecutionChain::new(Handler::Service(Arc::clone(handler)))))
    }
}

/// Dispatch lifecycle, logged as requests move through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Resolving,
    HandlerFound,
    NotFound,
    Invoking,
    ResponseWritten,
    ErrorResponse,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolving => "resolving",
            Self::HandlerFound => "handler_found",
            Self::NotFound => "not_found",
            Self::Invoking => "invoking",
            Self::ResponseWritten => "response_written",
            Self::ErrorResponse => "error_response",
        })
    }
}

/// Result of a successful [`Dispatcher::dispatch`].
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// A handler ran and the response was written.
    Handled { handler: Handler },
    /// No mapping produced a handler.
    NoHandler,
}

/// Routes a request through handler mappings to an adapter.
#[derive(Default)]
pub struct Dispatcher {
    mappings: Vec<Arc<dyn HandlerMapping>>,
    adapters: Vec<Arc<dyn HandlerAdapter>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mappings: Vec<&str> = self.mappings.iter().map(|m| m.name()).collect();
        f.debug_struct("Dispatcher")
            .field("mappings", &mappings)
            .field("adapters", &self.adapters.len())
            .finish()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping. Mappings stay sorted by `order()`; equal orders keep
    /// insertion order.
    #[must_use]
    pub fn with_mapping(mut self, mapping: Arc<dyn HandlerMapping>) -> Self {
        self.mappings.push(mapping);
        self.mappings.sort_by_key(|m| m.order());
        self
    }

    /// Add an adapter. Adapters are asked in insertion order.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn HandlerAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    #[must_use]
    pub fn mappings(&self) -> &[Arc<dyn HandlerMapping>] {
        &self.mappings
    }

    /// Dispatch with a fresh [`RequestContext`].
    ///
    /// # Errors
    ///
    /// See [`dispatch_with_context`](Self::dispatch_with_context).
    pub fn dispatch(
        &self,
        request: &ServerRequest,
        response: &mut ServerResponse,
    ) -> Result<DispatchOutcome, DispatchError> {
        let mut ctx = RequestContext::for_request(request);
        self.dispatch_with_context(request, &mut ctx, response)
    }

    /// Resolve, pick an adapter and run the handler.
    ///
    /// No handler is an outcome, not an error. Panics inside a handler are caught
    /// and reported as [`DispatchError::HandlerFailed`].
    ///
    /// # Errors
    ///
    /// - [`DispatchError::NoAdapter`] when no adapter supports the handler
    /// - [`DispatchError::HandlerFailed`] when the handler fails
    /// - [`DispatchError::Negotiation`] when resolution or writing is not acceptable
    pub fn dispatch_with_context(
        &self,
        request: &ServerRequest,
        ctx: &mut RequestContext,
        response: &mut ServerResponse,
    ) -> Result<DispatchOutcome, DispatchError> {
        let request_id = ctx.request_id();
        Self::transition(ctx, DispatchState::Resolving);

        let Some(chain) = self.resolve(request, ctx)? else {
            Self::transition(ctx, DispatchState::NotFound);
            return Ok(DispatchOutcome::NoHandler);
        };
        let handler = chain.into_handler();
        Self::transition(ctx, DispatchState::HandlerFound);

        let Some(adapter) = self.adapters.iter().find(|a| a.supports(&handler)) else {
            error!(
                request_id = %request_id,
                handler = %handler,
                adapters = self.adapters.len(),
                "No adapter for handler - CRITICAL"
            );
            return Err(DispatchError::NoAdapter {
                handler: handler.to_string(),
            });
        };

        Self::transition(ctx, DispatchState::Invoking);
        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| {
            adapter.handle(request, ctx, response, &handler)
        }))
        .unwrap_or_else(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            error!(
                request_id = %request_id,
                handler = %handler,
                panic_message = %message,
                "Handler panicked - CRITICAL"
            );
            Err(handler_failed(
                request,
                ctx,
                format!("handler panicked: {message}").into(),
            ))
        });

        match result {
            Ok(()) => {
                Self::transition(ctx, DispatchState::ResponseWritten);
                info!(
                    request_id = %request_id,
                    handler = %handler,
                    status = response.status().as_u16(),
                    execution_time_us = start.elapsed().as_micros(),
                    "Handler execution complete"
                );
                Ok(DispatchOutcome::Handled { handler })
            }
            Err(err) => {
                warn!(
                    request_id = %request_id,
                    handler = %handler,
                    error = %err,
                    execution_time_us = start.elapsed().as_micros(),
                    "Handler execution failed"
                );
                Err(err)
            }
        }
    }

    fn resolve(
        &self,
        request: &ServerRequest,
        ctx: &mut RequestContext,
    ) -> Result<Option<HandlerExecutionChain>, DispatchError> {
        for mapping in &self.mappings {
            if let Some(chain) = mapping.handler(request, ctx)? {
                debug!(
                    request_id = %ctx.request_id(),
                    mapping = mapping.name(),
                    handler = %chain.handler(),
                    "Handler lookup"
                );
                return Ok(Some(chain));
            }
        }
        Ok(None)
    }

    /// Dispatch and turn the outcome into a finished transport response.
    ///
    /// No handler becomes 404; errors become their
    /// [`status_code`](DispatchError::status_code) with a JSON error body, unless
    /// the handler already committed the response.
    pub fn service(&self, request: &ServerRequest, response: &mut ServerResponse) {
        let mut ctx = RequestContext::for_request(request);
        match self.dispatch_with_context(request, &mut ctx, response) {
            Ok(DispatchOutcome::Handled { .. }) => {}
            Ok(DispatchOutcome::NoHandler) => {
                Self::transition(&ctx, DispatchState::ErrorResponse);
                response.write_json_error(
                    StatusCode::NOT_FOUND,
                    &format!("No handler for {} {}", request.method(), request.raw_path()),
                );
            }
            Err(err) => {
                Self::transition(&ctx, DispatchState::ErrorResponse);
                response.write_json_error(err.status_code(), &err.to_string());
            }
        }
        response.finish();
    }

    fn transition(ctx: &RequestContext, state: DispatchState) {
        debug!(
            request_id = %ctx.request_id(),
            state = %state,
            lookup_path = ?ctx.lookup_path(),
            "Dispatch state"
        );
    }
}
