//! # routeforge
//!
//! **routeforge** is the request-dispatch core of an annotation-style web
//! framework: handler methods are registered under routing keys (path patterns,
//! HTTP methods, header and `produces` conditions), incoming requests are
//! resolved to the single best handler, and the handler's return value is
//! written in a representation chosen by content negotiation.
//!
//! ## Architecture
//!
//! - **[`router`]** - Ant-style path matching, routing keys, the concurrent
//!   mapping registry and best-match resolution
//! - **[`negotiation`]** - ordered chain of strategies that determine the
//!   acceptable media types (`Accept` header, query parameter, path extension)
//! - **[`converter`]** - message converters and the pipeline that selects a
//!   media type and writes the return value
//! - **[`dispatcher`]** - front controller: handler mappings, adapters, panic
//!   recovery and error responses
//! - **[`media`]** - media type parsing, compatibility and specificity ordering
//! - **[`server`]** - transport-neutral request, response and message types
//! - **[`config`]** - environment switches and route table files
//! - **[`registry`]** - handler implementations keyed by descriptor
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Request Handling Flow
//!
//! ```text
//! ServerRequest
//!   -> Dispatcher           (asks each HandlerMapping, lowest order first)
//!   -> Router::resolve      (lookup path, direct index or scan, compare_to)
//!   -> HandlerAdapter       (MethodHandlerAdapter invokes the handler)
//!   -> ReturnValueWriter    (acceptable x producible, select, convert)
//!   -> ServerResponse       (Content-Type, Content-Length, body written once)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use http::{Method, StatusCode};
//! use routeforge::config::DispatchConfig;
//! use routeforge::handler::{HandlerDescriptor, ReturnType, ReturnValue};
//! use routeforge::registry::HandlerTable;
//! use routeforge::server::{ServerRequest, ServerResponse};
//!
//! let config = DispatchConfig::default();
//! let router = Arc::new(config.router(Arc::new(config.negotiation_manager())));
//!
//! let mut handlers = HandlerTable::new();
//! let key = router.mapping(["/beans/{name}"]).method(Method::GET).build().unwrap();
//! handlers.define(
//!     HandlerDescriptor::named("BeanController", "bean", ReturnType::text()),
//!     key,
//!     |_request, ctx, _response| Ok(ctx.uri_variable("name").map(ReturnValue::from)),
//! );
//! handlers.register_all(&router).unwrap();
//!
//! let dispatcher = config.dispatcher(Arc::clone(&router), Arc::new(handlers));
//! let request = ServerRequest::get("/beans/a1").with_accept("application/json");
//! let mut response = ServerResponse::new();
//! dispatcher.service(&request, &mut response);
//!
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.body_bytes(), br#""a1""#);
//! ```

pub mod cli;
pub mod config;
pub mod converter;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod media;
pub mod negotiation;
pub mod registry;
pub mod router;
pub mod server;

pub use config::{DispatchConfig, RouteTable};
pub use converter::{ConverterRegistry, JsonConverter, MessageConverter, ReturnValueWriter};
pub use dispatcher::{DispatchOutcome, Dispatcher, Handler, HandlerMapping};
pub use error::{DispatchError, MappingError, NegotiationError};
pub use handler::{HandlerDescriptor, ReturnType, ReturnValue};
pub use media::MediaType;
pub use negotiation::ContentNegotiationManager;
pub use registry::HandlerTable;
pub use router::{Router, RoutingKey};
pub use server::{RequestContext, ServerRequest, ServerResponse};
