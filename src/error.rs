//! Error types for registration, negotiation and dispatch.
//!
//! Three families cover the three phases a request passes through:
//!
//! - [`MappingError`] - raised while building the routing table (startup)
//! - [`NegotiationError`] - raised while choosing and writing a representation
//! - [`DispatchError`] - raised by the [`Dispatcher`](crate::dispatcher::Dispatcher)
//!
//! "No handler matched" is not an error; see
//! [`DispatchOutcome::NoHandler`](crate::dispatcher::DispatchOutcome).

use http::{Method, StatusCode};

use crate::ids::RequestId;
use crate::media::MediaType;

/// Errors raised while registering mappings or parsing route templates.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// An equal routing key is already mapped to a different handler.
    #[error(
        "Ambiguous mapping. Cannot map '{new_handler}' method {key}: \
         there is already '{existing_handler}' mapped"
    )]
    AmbiguousMapping {
        key: String,
        new_handler: String,
        existing_handler: String,
    },

    /// A route template failed to parse.
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A `produces` or header condition failed to parse.
    #[error("invalid mapping condition '{condition}': {reason}")]
    InvalidCondition { condition: String, reason: String },

    /// Two patterns cannot be merged (e.g. `/*.html` with `/*.txt`).
    #[error("cannot combine patterns '{first}' and '{second}'")]
    CannotCombine { first: String, second: String },
}

/// Errors raised by content negotiation and message conversion.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    /// No producible type is compatible with any acceptable type.
    #[error("no acceptable representation; producible types: {}", format_types(.producible))]
    NotAcceptable { producible: Vec<MediaType> },

    /// The `Accept` header (or an equivalent input) could not be parsed.
    #[error("could not parse Accept header '{value}': {reason}")]
    InvalidAcceptHeader { value: String, reason: String },

    /// A negotiation key (query parameter value) has no registered media type.
    #[error("unknown media type key '{key}'")]
    UnknownMediaTypeKey { key: String },

    /// No converter can write a value of the given type.
    #[error("no converter for [{value_type}]{}", .media_type.as_ref().map(|m| format!(" with Content-Type '{m}'")).unwrap_or_default())]
    NoConverterForType {
        value_type: String,
        media_type: Option<MediaType>,
    },

    /// A media type string is malformed.
    #[error("invalid media type '{value}': {reason}")]
    InvalidMediaType { value: String, reason: String },

    /// A converter failed to serialize or deserialize a value.
    #[error("{converter} conversion failed: {message}")]
    Conversion {
        converter: &'static str,
        message: String,
    },

    /// Writing to or reading from the transport failed.
    #[error("I/O error during message conversion: {0}")]
    Io(#[from] std::io::Error),
}

impl NegotiationError {
    /// Transport status this error should surface as.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAcceptable { .. }
            | Self::InvalidAcceptHeader { .. }
            | Self::UnknownMediaTypeKey { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::InvalidMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NoConverterForType { .. } | Self::Conversion { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Errors returned by [`Dispatcher::dispatch`](crate::dispatcher::Dispatcher::dispatch).
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A handler was resolved but no adapter supports it. This is a
    /// configuration error, not a per-request condition.
    #[error("no adapter for handler '{handler}': the dispatcher configuration needs an adapter that supports it")]
    NoAdapter { handler: String },

    /// The handler itself failed.
    #[error("handler failed for {method} {path} (request {request_id})")]
    HandlerFailed {
        request_id: RequestId,
        method: Method,
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// A handler mapping failed while resolving.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Writing the handler's return value failed.
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

impl DispatchError {
    /// Transport status this error should surface as.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Negotiation(err) => err.status_code(),
            Self::NoAdapter { .. } | Self::HandlerFailed { .. } | Self::Mapping(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn format_types(types: &[MediaType]) -> String {
    let joined: Vec<String> = types.iter().map(ToString::to_string).collect();
    format!("[{}]", joined.join(", "))
}
