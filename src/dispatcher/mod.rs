//! # Dispatcher Module
//!
//! Front controller that takes a request from resolution to a written response.
//!
//! ## Request Flow
//!
//! 1. Each [`HandlerMapping`] is asked for a handler, lowest `order()` first; the
//!    first non-empty answer wins. The [`Router`](crate::router::Router) is the
//!    main mapping; [`StaticHandlerMapping`] serves fixed paths.
//! 2. The first [`HandlerAdapter`] whose `supports()` accepts the handler runs it.
//!    No adapter is a configuration error ([`DispatchError::NoAdapter`]).
//! 3. [`MethodHandlerAdapter`] calls the [`HandlerInvoker`] and hands the return
//!    value to the [`ReturnValueWriter`](crate::converter::ReturnValueWriter);
//!    [`ServiceHandlerAdapter`] lets the handler write the response itself.
//!
//! States move `Resolving -> HandlerFound -> Invoking -> ResponseWritten`, or
//! `Resolving -> NotFound -> ErrorResponse`; each transition is logged at debug
//! level with the request id.
//!
//! ## Error Handling
//!
//! - no handler is [`DispatchOutcome::NoHandler`], not an error
//! - handler errors and panics become [`DispatchError::HandlerFailed`] carrying
//!   the request id, method and path
//! - [`Dispatcher::service`] maps outcomes to 404 / 406 / 500 JSON error bodies
//!   and finishes the response
//!
//! [`DispatchError::NoAdapter`]: crate::error::DispatchError::NoAdapter
//! [`DispatchError::HandlerFailed`]: crate::error::DispatchError::HandlerFailed

mod adapter;
mod core;

pub use adapter::{
    HandlerAdapter, HandlerInvoker, MethodHandlerAdapter, ServiceHandler, ServiceHandlerAdapter,
};
pub use core::{
    DispatchOutcome, DispatchState, Dispatcher, Handler, HandlerExecutionChain, HandlerMapping,
    StaticHandlerMapping,
};
