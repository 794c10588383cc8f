//! # Router Module
//!
//! Maps requests to handler methods by routing key and picks the best match when
//! several keys apply.
//!
//! ## Overview
//!
//! - [`PathMatcher`] / [`AntPathMatcher`] match Ant-style patterns (`?`, `*`,
//!   `**`, `{name}`, `{name:regex}`) and extract URI variables
//! - [`PatternComparator`] orders patterns by specificity for one lookup path
//! - [`RoutingKey`] bundles path patterns, methods, header and `produces`
//!   conditions plus one optional [`CustomCondition`]
//! - [`MappingRegistry`] stores key to handler mappings; readers work on an
//!   immutable [`RegistrySnapshot`], writers are serialized
//! - [`Router`] resolves a request against the registry
//!
//! ## Resolution
//!
//! 1. Compute the lookup path (context path removed, semicolon content
//!    stripped, percent-decoded).
//! 2. Keys registered under that exact path are tried first. If none of them
//!    matches, every key is scanned.
//! 3. Each candidate is narrowed to the conditions that matched the request.
//!    Keys that matched everything except `produces` are remembered; if nothing
//!    else matched, the request is rejected as not acceptable.
//! 4. Matches are sorted by [`RoutingKey::compare_to`]: patterns first, then
//!    the number of methods (fewer first), then the custom condition (header
//!    expressions included, more specific first), then `produces`. Equal keys
//!    keep registration order and the earlier registration wins.
//!
//! `HEAD` requests match `GET` mappings.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use routeforge::handler::{HandlerDescriptor, ReturnType};
//! use routeforge::router::Router;
//! use routeforge::server::{RequestContext, ServerRequest};
//!
//! let router = Router::new();
//! let key = router.mapping(["/users/{id}"]).method(Method::GET).build().unwrap();
//! router
//!     .register_handler(key, HandlerDescriptor::named("UserController", "user", ReturnType::json("User")))
//!     .unwrap();
//!
//! let request = ServerRequest::get("/users/42");
//! let mut ctx = RequestContext::for_request(&request);
//! let resolved = router.resolve(&request, &mut ctx).unwrap().unwrap();
//! assert_eq!(resolved.uri_variable("id"), Some("42"));
//! assert_eq!(resolved.best_pattern.as_deref(), Some("/users/{id}"));
//! ```
//!
//! ## Performance
//!
//! Resolution never takes a lock: it loads the current snapshot once and works
//! on it. URI variables live in a [`ParamVec`] that stays on the stack for up to
//! [`MAX_INLINE_PARAMS`] entries. Resolutions slower than 1ms are logged.

mod core;
mod key;
mod matcher;
mod registry;
#[cfg(test)]
mod tests;

pub use core::{ParamVec, ResolvedHandler, Router, MAX_INLINE_PARAMS};
pub use key::{
    CustomCondition, HeaderCondition, MatchContext, MatchOptions, RoutingKey, RoutingKeyBuilder,
};
pub use matcher::{AntPathMatcher, PathMatcher, PathPattern, PatternComparator, PatternInfo};
pub use registry::{MappingRegistration, MappingRegistry, RegistrySnapshot};
