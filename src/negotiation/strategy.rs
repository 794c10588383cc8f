use std::collections::HashMap;
use std::fmt;

use http::header::ACCEPT;
use tracing::debug;

use crate::error::NegotiationError;
use crate::media::{sort_by_specificity_and_quality, MediaType};
use crate::server::ServerRequest;

/// "Accept anything": what a strategy returns when it has no opinion.
#[must_use]
pub fn media_type_all_list() -> Vec<MediaType> {
    vec![MediaType::all()]
}

/// Whether `media_types` is exactly the `[*/*]` sentinel.
#[must_use]
pub fn is_media_type_all_list(media_types: &[MediaType]) -> bool {
    matches!(media_types, [only] if *only == *crate::media::ALL)
}

/// Resolves the media types a request accepts.
pub trait ContentNegotiationStrategy: Send + Sync + fmt::Debug {
    /// Acceptable types, most preferred first, or the `[*/*]` sentinel.
    ///
    /// # Errors
    ///
    /// Fails when the request states a preference that cannot be understood.
    fn resolve_media_types(
        &self,
        request: &ServerRequest,
        lookup_path: Option<&str>,
    ) -> Result<Vec<MediaType>, NegotiationError>;
}

/// Reads the `Accept` header. All header values are joined, parsed and sorted by
/// quality and specificity.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderContentNegotiationStrategy;

impl ContentNegotiationStrategy for HeaderContentNegotiationStrategy {
    fn resolve_media_types(
        &self,
        request: &ServerRequest,
        _lookup_path: Option<&str>,
    ) -> Result<Vec<MediaType>, NegotiationError> {
        let values: Vec<&str> = request.header_values(ACCEPT.as_str()).collect();
        if values.is_empty() {
            return Ok(media_type_all_list());
        }
        let joined = values.join(",");
        let mut media_types = MediaType::parse_list(&joined).map_err(|err| {
            debug!(accept = %joined, error = %err, "Unparsable Accept header");
            NegotiationError::InvalidAcceptHeader {
                value: joined.clone(),
                reason: err.to_string(),
            }
        })?;
        if media_types.is_empty() {
            return Ok(media_type_all_list());
        }
        sort_by_specificity_and_quality(&mut media_types);
        Ok(media_types)
    }
}

/// Lookup table from short keys (`json`) to media types. Keys are case-insensitive.
#[derive(Debug, Clone)]
pub struct MediaTypeMappings {
    mappings: HashMap<String, MediaType>,
}

impl Default for MediaTypeMappings {
    fn default() -> Self {
        let mut mappings = Self::empty();
        mappings.add("json", MediaType::application_json());
        mappings
    }
}

impl MediaTypeMappings {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    pub fn add(&mut self, key: &str, media_type: MediaType) {
        self.mappings.insert(key.to_ascii_lowercase(), media_type);
    }

    #[must_use]
    pub fn with(mut self, key: &str, media_type: MediaType) -> Self {
        self.add(key, media_type);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MediaType> {
        self.mappings.get(&key.to_ascii_lowercase())
    }
}

/// Reads a query parameter (`?format=json`) and maps its value through
/// [`MediaTypeMappings`]. An unknown value is an error.
#[derive(Debug, Clone)]
pub struct ParameterContentNegotiationStrategy {
    parameter_name: String,
    mappings: MediaTypeMappings,
}

impl Default for ParameterContentNegotiationStrategy {
    fn default() -> Self {
        Self::new("format", MediaTypeMappings::default())
    }
}

impl ParameterContentNegotiationStrategy {
    pub fn new(parameter_name: impl Into<String>, mappings: MediaTypeMappings) -> Self {
        Self {
            parameter_name: parameter_name.into(),
            mappings,
        }
    }

    #[must_use]
    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }
}

impl ContentNegotiationStrategy for ParameterContentNegotiationStrategy {
    fn resolve_media_types(
        &self,
        request: &ServerRequest,
        _lookup_path: Option<&str>,
    ) -> Result<Vec<MediaType>, NegotiationError> {
        let Some(key) = request
            .query_param(&self.parameter_name)
            .filter(|key| !key.is_empty())
        else {
            return Ok(media_type_all_list());
        };
        match self.mappings.get(key) {
            Some(media_type) => Ok(vec![media_type.clone()]),
            None => Err(NegotiationError::UnknownMediaTypeKey {
                key: key.to_string(),
            }),
        }
    }
}

/// Uses the file extension of the last lookup-path segment (`/beans.json`).
/// Unknown extensions are ignored unless configured otherwise.
#[derive(Debug, Clone)]
pub struct PathExtensionContentNegotiationStrategy {
    mappings: MediaTypeMappings,
    ignore_unknown_extensions: bool,
}

impl Default for PathExtensionContentNegotiationStrategy {
    fn default() -> Self {
        Self::new(MediaTypeMappings::default())
    }
}

impl PathExtensionContentNegotiationStrategy {
    #[must_use]
    pub fn new(mappings: MediaTypeMappings) -> Self {
        Self {
            mappings,
            ignore_unknown_extensions: true,
        }
    }

    #[must_use]
    pub fn ignore_unknown_extensions(mut self, ignore: bool) -> Self {
        self.ignore_unknown_extensions = ignore;
        self
    }
}

fn path_extension(path: &str) -> Option<&str> {
    let filename = path.rsplit('/').next().unwrap_or(path);
    let filename = filename.split(';').next().unwrap_or(filename);
    let (_, extension) = filename.rsplit_once('.')?;
    (!extension.is_empty()).then_some(extension)
}

impl ContentNegotiationStrategy for PathExtensionContentNegotiationStrategy {
    fn resolve_media_types(
        &self,
        request: &ServerRequest,
        lookup_path: Option<&str>,
    ) -> Result<Vec<MediaType>, NegotiationError> {
        let path = lookup_path.unwrap_or_else(|| request.raw_path());
        let Some(extension) = path_extension(path) else {
            return Ok(media_type_all_list());
        };
        match self.mappings.get(extension) {
            Some(media_type) => Ok(vec![media_type.clone()]),
            None if self.ignore_unknown_extensions => Ok(media_type_all_list()),
            None => Err(NegotiationError::UnknownMediaTypeKey {
                key: extension.to_string(),
            }),
        }
    }
}

/// Always returns the configured list. Usually placed last as a default.
#[derive(Debug, Clone)]
pub struct FixedContentNegotiationStrategy {
    media_types: Vec<MediaType>,
}

impl FixedContentNegotiationStrategy {
    #[must_use]
    pub fn new(media_types: Vec<MediaType>) -> Self {
        Self { media_types }
    }
}

impl ContentNegotiationStrategy for FixedContentNegotiationStrategy {
    fn resolve_media_types(
        &self,
        _request: &ServerRequest,
        _lookup_path: Option<&str>,
    ) -> Result<Vec<MediaType>, NegotiationError> {
        Ok(self.media_types.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(strategy: &dyn ContentNegotiationStrategy, request: &ServerRequest) -> Vec<String> {
        strategy
            .resolve_media_types(request, None)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_header_strategy_without_accept_returns_sentinel() {
        let types = HeaderContentNegotiationStrategy
            .resolve_media_types(&ServerRequest::get("/"), None)
            .unwrap();
        assert!(is_media_type_all_list(&types));
    }

    #[test]
    fn test_header_strategy_joins_and_sorts_values() {
        let request = ServerRequest::get("/")
            .with_accept("text/*;q=0.5")
            .with_accept("application/json, */*;q=0.1");
        assert_eq!(
            resolve(&HeaderContentNegotiationStrategy, &request),
            vec!["application/json", "text/*;q=0.5", "*/*;q=0.1"]
        );
    }

    #[test]
    fn test_header_strategy_empty_accept_returns_sentinel() {
        let request = ServerRequest::get("/").with_accept(" , ");
        assert_eq!(resolve(&HeaderContentNegotiationStrategy, &request), vec!["*/*"]);
    }

    #[test]
    fn test_header_strategy_rejects_garbage() {
        let request = ServerRequest::get("/").with_accept("text");
        let err = HeaderContentNegotiationStrategy
            .resolve_media_types(&request, None)
            .unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidAcceptHeader { .. }));
    }

    #[test]
    fn test_parameter_strategy() {
        let strategy = ParameterContentNegotiationStrategy::default();
        assert_eq!(
            resolve(&strategy, &ServerRequest::get("/beans?format=JSON")),
            vec!["application/json"]
        );
        assert_eq!(resolve(&strategy, &ServerRequest::get("/beans")), vec!["*/*"]);
        let err = strategy
            .resolve_media_types(&ServerRequest::get("/beans?format=xml"), None)
            .unwrap_err();
        assert!(matches!(err, NegotiationError::UnknownMediaTypeKey { key } if key == "xml"));
    }

    #[test]
    fn test_path_extension_strategy() {
        let strategy = PathExtensionContentNegotiationStrategy::default();
        let request = ServerRequest::get("/api/beans.json");
        assert_eq!(resolve(&strategy, &request), vec!["application/json"]);
        assert_eq!(
            strategy
                .resolve_media_types(&request, Some("/api/beans.unknown"))
                .unwrap(),
            media_type_all_list()
        );
        assert_eq!(resolve(&strategy, &ServerRequest::get("/v1.2/beans")), vec!["*/*"]);

        let strict = PathExtensionContentNegotiationStrategy::default().ignore_unknown_extensions(false);
        assert!(strict
            .resolve_media_types(&ServerRequest::get("/beans.xml"), None)
            .is_err());
    }

    #[test]
    fn test_fixed_strategy() {
        let strategy = FixedContentNegotiationStrategy::new(vec![MediaType::application_json()]);
        assert_eq!(resolve(&strategy, &ServerRequest::get("/")), vec!["application/json"]);
    }
}
