//! # Negotiation Module
//!
//! Determines which media types a request accepts.
//!
//! A [`ContentNegotiationManager`] holds an ordered chain of
//! [`ContentNegotiationStrategy`] implementations. Each strategy either returns a
//! concrete preference or the `[*/*]` sentinel meaning "no opinion"; the first
//! non-sentinel answer wins and the sentinel is returned when every strategy
//! abstains.
//!
//! ## Strategies
//!
//! | Strategy | Source | Typical use |
//! |----------|--------|-------------|
//! | [`HeaderContentNegotiationStrategy`] | `Accept` header | default, always present |
//! | [`ParameterContentNegotiationStrategy`] | `?format=json` | browsers, curl |
//! | [`PathExtensionContentNegotiationStrategy`] | `/beans.json` | legacy clients |
//! | [`FixedContentNegotiationStrategy`] | configuration | fallback default |
//!
//! ## Example
//!
//! ```rust
//! use routeforge::negotiation::ContentNegotiationManager;
//! use routeforge::server::ServerRequest;
//!
//! let manager = ContentNegotiationManager::default();
//! let request = ServerRequest::get("/api/beans").with_accept("application/json");
//! let types = manager.resolve_media_types(&request, None).unwrap();
//! assert_eq!(types[0].to_string(), "application/json");
//! ```

mod strategy;

use std::sync::Arc;

use tracing::debug;

use crate::error::NegotiationError;
use crate::media::MediaType;
use crate::server::ServerRequest;

pub use strategy::{
    is_media_type_all_list, media_type_all_list, ContentNegotiationStrategy,
    FixedContentNegotiationStrategy, HeaderContentNegotiationStrategy, MediaTypeMappings,
    ParameterContentNegotiationStrategy, PathExtensionContentNegotiationStrategy,
};

/// Ordered chain of negotiation strategies. Immutable once built.
#[derive(Debug, Clone)]
pub struct ContentNegotiationManager {
    strategies: Vec<Arc<dyn ContentNegotiationStrategy>>,
}

impl Default for ContentNegotiationManager {
    fn default() -> Self {
        Self {
            strategies: vec![Arc::new(HeaderContentNegotiationStrategy)],
        }
    }
}

impl ContentNegotiationManager {
    /// Build a chain. An empty list falls back to the header strategy alone.
    #[must_use]
    pub fn new(strategies: Vec<Arc<dyn ContentNegotiationStrategy>>) -> Self {
        if strategies.is_empty() {
            debug!("No negotiation strategies configured, using Accept header only");
            return Self::default();
        }
        Self { strategies }
    }

    #[must_use]
    pub fn strategies(&self) -> &[Arc<dyn ContentNegotiationStrategy>] {
        &self.strategies
    }

    /// Ask each strategy in turn; the first answer other than `[*/*]` wins.
    ///
    /// # Errors
    ///
    /// The first strategy error ends the chain and is returned.
    pub fn resolve_media_types(
        &self,
        request: &ServerRequest,
        lookup_path: Option<&str>,
    ) -> Result<Vec<MediaType>, NegotiationError> {
        for strategy in &self.strategies {
            let media_types = strategy.resolve_media_types(request, lookup_path)?;
            if is_media_type_all_list(&media_types) {
                continue;
            }
            return Ok(media_types);
        }
        Ok(media_type_all_list())
    }
}

impl ContentNegotiationStrategy for ContentNegotiationManager {
    fn resolve_media_types(
        &self,
        request: &ServerRequest,
        lookup_path: Option<&str>,
    ) -> Result<Vec<MediaType>, NegotiationError> {
        ContentNegotiationManager::resolve_media_types(self, request, lookup_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ContentNegotiationManager {
        ContentNegotiationManager::new(vec![
            Arc::new(ParameterContentNegotiationStrategy::default()),
            Arc::new(HeaderContentNegotiationStrategy),
            Arc::new(FixedContentNegotiationStrategy::new(vec![
                MediaType::application_json(),
            ])),
        ])
    }

    #[test]
    fn test_first_non_sentinel_answer_wins() {
        let request = ServerRequest::get("/beans?format=json").with_accept("text/plain");
        let types = chain().resolve_media_types(&request, None).unwrap();
        assert_eq!(types, vec![MediaType::application_json()]);

        let request = ServerRequest::get("/beans").with_accept("text/plain");
        let types = chain().resolve_media_types(&request, None).unwrap();
        assert_eq!(types, vec![MediaType::text_plain()]);
    }

    #[test]
    fn test_fixed_default_applies_when_others_abstain() {
        let types = chain()
            .resolve_media_types(&ServerRequest::get("/beans"), None)
            .unwrap();
        assert_eq!(types, vec![MediaType::application_json()]);
    }

    #[test]
    fn test_all_abstaining_yields_sentinel() {
        let manager = ContentNegotiationManager::new(Vec::new());
        let types = manager
            .resolve_media_types(&ServerRequest::get("/"), None)
            .unwrap();
        assert!(is_media_type_all_list(&types));
    }

    #[test]
    fn test_strategy_error_stops_the_chain() {
        let request = ServerRequest::get("/beans?format=yaml");
        assert!(chain().resolve_media_types(&request, None).is_err());
    }
}
