use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::core::Handler;
use crate::converter::ReturnValueWriter;
use crate::error::DispatchError;
use crate::handler::{HandlerDescriptor, ReturnValue};
use crate::server::{RequestContext, ServerRequest, ServerResponse};

/// Invokes handler methods. Argument binding and target lookup live behind this
/// seam; the dispatcher only sees the return value.
pub trait HandlerInvoker: Send + Sync {
    /// Call `handler` for the request. `Ok(None)` means the method returned no value.
    ///
    /// # Errors
    ///
    /// Whatever the handler fails with; the adapter wraps it with request context.
    fn invoke(
        &self,
        handler: &HandlerDescriptor,
        request: &ServerRequest,
        ctx: &RequestContext,
        response: &mut ServerResponse,
    ) -> anyhow::Result<Option<ReturnValue>>;
}

/// A handler that writes the response itself.
pub trait ServiceHandler: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Whatever the handler fails with.
    fn service(
        &self,
        request: &ServerRequest,
        ctx: &RequestContext,
        response: &mut ServerResponse,
    ) -> anyhow::Result<()>;
}

/// Runs one kind of [`Handler`].
pub trait HandlerAdapter: Send + Sync {
    fn supports(&self, handler: &Handler) -> bool;

    /// # Errors
    ///
    /// [`DispatchError::HandlerFailed`] for handler failures, or a negotiation
    /// error while writing the result.
    fn handle(
        &self,
        request: &ServerRequest,
        ctx: &RequestContext,
        response: &mut ServerResponse,
        handler: &Handler,
    ) -> Result<(), DispatchError>;
}

pub(crate) fn handler_failed(
    request: &ServerRequest,
    ctx: &RequestContext,
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
) -> DispatchError {
    DispatchError::HandlerFailed {
        request_id: ctx.request_id(),
        method: request.method().clone(),
        path: request.raw_path().to_string(),
        source,
    }
}

/// Adapter for [`Handler::Method`]: invokes through a [`HandlerInvoker`] and
/// writes the return value through a [`ReturnValueWriter`].
pub struct MethodHandlerAdapter {
    invoker: Arc<dyn HandlerInvoker>,
    writer: ReturnValueWriter,
}

impl fmt::Debug for MethodHandlerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodHandlerAdapter")
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl MethodHandlerAdapter {
    #[must_use]
    pub fn new(invoker: Arc<dyn HandlerInvoker>, writer: ReturnValueWriter) -> Self {
        Self { invoker, writer }
    }

    #[must_use]
    pub fn writer(&self) -> &ReturnValueWriter {
        &self.writer
    }
}

impl HandlerAdapter for MethodHandlerAdapter {
    fn supports(&self, handler: &Handler) -> bool {
        matches!(handler, Handler::Method(_))
    }

    fn handle(
        &self,
        request: &ServerRequest,
        ctx: &RequestContext,
        response: &mut ServerResponse,
        handler: &Handler,
    ) -> Result<(), DispatchError> {
        let Handler::Method(descriptor) = handler else {
            return Err(DispatchError::NoAdapter {
                handler: handler.to_string(),
            });
        };

        let value = self
            .invoker
            .invoke(descriptor, request, ctx, response)
            .map_err(|err| handler_failed(request, ctx, err.into()))?;

        let declared = descriptor.return_type();
        if value.is_none() && declared.is_unit() {
            debug!(
                request_id = %ctx.request_id(),
                handler = %descriptor,
                "Handler returned no body"
            );
            return Ok(());
        }

        let written = self
            .writer
            .negotiate_and_write(value.as_ref(), declared, request, ctx, response)?;
        info!(
            request_id = %ctx.request_id(),
            handler = %descriptor,
            media_type = ?written.as_ref().map(ToString::to_string),
            status = response.status().as_u16(),
            bytes = response.body_bytes().len(),
            "Handler result written"
        );
        Ok(())
    }
}

/// Adapter for [`Handler::Service`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceHandlerAdapter;

impl HandlerAdapter for ServiceHandlerAdapter {
    fn supports(&self, handler: &Handler) -> bool {
        matches!(handler, Handler::Service(_))
    }

    fn handle(
        &self,
        request: &ServerRequest,
        ctx: &RequestContext,
        response: &mut ServerResponse,
        handler: &Handler,
    ) -> Result<(), DispatchError> {
        let Handler::Service(service) = handler else {
            return Err(DispatchError::NoAdapter {
                handler: handler.to_string(),
            });
        };
        service
            .service(request, ctx, response)
            .map_err(|err| handler_failed(request, ctx, err.into()))
    }
}
