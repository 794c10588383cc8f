//! # CLI Module
//!
//! Command-line access to the dispatch core, driven by a route table file.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! List the mappings a route table registers, in registration order:
//!
//! ```bash
//! routeforge routes --file routes.yaml
//! ```
//!
//! ### `check`
//!
//! Load and register a table without serving anything. Ambiguous mappings and
//! malformed definitions fail with a non-zero exit code.
//!
//! ### `resolve`
//!
//! Push one request through the full dispatcher and print the response. Every
//! route is implemented by an echo handler that reports what resolution
//! recorded (best pattern, URI variables, request id):
//!
//! ```bash
//! routeforge resolve --file routes.yaml --path /api/beans/a1 --accept 'application/json'
//! routeforge resolve --file routes.yaml --method DELETE --path /api/beans/a1
//! ```
//!
//! `/health` is always answered by a static handler.
//!
//! ## Configuration
//!
//! Matching and negotiation switches come from `ROUTEFORGE_*` environment
//! variables, see [`DispatchConfig`](crate::config::DispatchConfig). Logging is
//! configured by `ROUTEFORGE_LOG_*`, see [`logging`](crate::logging).

mod commands;


pub use commands::{
    build_dispatcher, render_response, render_routes, run_cli, Cli, Commands, HealthHandler,
};
