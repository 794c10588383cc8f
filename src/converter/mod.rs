//! # Converter Module
//!
//! Turns handler return values into response bodies.
//!
//! - [`MessageConverter`] - a pluggable reader/writer for a family of media types
//! - [`ConverterRegistry`] - ordered converters; the first one that can write wins
//! - [`ReturnValueWriter`] - negotiates the response media type and writes the
//!   value exactly once through the chosen converter
//!
//! ## Selecting a media type
//!
//! 1. A concrete `Content-Type` already on the response is used as-is.
//! 2. Otherwise the acceptable types (negotiation chain) are intersected with the
//!    producible types: the matched key's `produces` if it declared any, else
//!    everything a converter can write for the value.
//! 3. The intersection is sorted by quality and specificity and the first
//!    concrete type is chosen. `*/*` and `application/*` fall back to
//!    `application/octet-stream`.
//!
//! A `None` value never fails for lack of a compatible type; nothing is written.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use routeforge::converter::{ConverterRegistry, ReturnValueWriter};
//! use routeforge::handler::{ReturnType, ReturnValue};
//! use routeforge::negotiation::ContentNegotiationManager;
//! use routeforge::server::{RequestContext, ServerRequest, ServerResponse};
//!
//! let writer = ReturnValueWriter::new(
//!     Arc::new(ConverterRegistry::with_defaults()),
//!     Arc::new(ContentNegotiationManager::default()),
//! );
//! let request = ServerRequest::get("/api/beans").with_accept("application/json");
//! let ctx = RequestContext::for_request(&request);
//! let mut response = ServerResponse::new();
//! let value = ReturnValue::Json(serde_json::json!(["beanA"]));
//! writer
//!     .negotiate_and_write(Some(&value), &ReturnType::json("List<String>"), &request, &ctx, &mut response)
//!     .unwrap();
//! assert_eq!(response.body_bytes(), br#"["beanA"]"#);
//! ```

mod core;
mod json;
mod pipeline;

pub use core::{
    add_default_headers, supports_for_read, supports_for_write, ConverterRegistry, MessageConverter,
};
pub use json::JsonConverter;
pub use pipeline::ReturnValueWriter;
