//! # Server Module
//!
//! Request and response abstractions the dispatch core works against. The
//! transport (socket handling, HTTP parsing) lives outside this crate; it builds a
//! [`ServerRequest`], hands it to the
//! [`Dispatcher`](crate::dispatcher::Dispatcher) with a fresh [`ServerResponse`],
//! and calls [`ServerResponse::finish`] when it has sent the bytes.
//!
//! ## Components
//!
//! - [`request`] - method, raw path, query parameters, headers, body
//! - [`response`] - status, headers, a flush-counting body buffer
//! - [`message`] - [`OutputMessage`] / [`InputMessage`], the narrow views handed
//!   to converters
//! - [`path`] - lookup path normalization ([`LookupPathResolver`])
//! - [`context`] - [`RequestContext`], per-request resolution results
//!
//! ## Committed vs finished
//!
//! Flushing the body commits the response (status and headers can no longer be
//! replaced by an error body). Finishing it is the transport's decision alone.

pub mod context;
pub mod message;
pub mod path;
pub mod request;
pub mod response;

pub use context::RequestContext;
pub use message::{InputMessage, OutputMessage};
pub use path::LookupPathResolver;
pub use request::{parse_query_params, ServerRequest};
pub use response::{ResponseBody, ServerResponse};
