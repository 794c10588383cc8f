use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, Method};
use tracing::{debug, warn};

use crate::media::MediaType;

/// An incoming request as seen by the dispatch core.
///
/// The raw path (including any `;name=value` segments) is preserved; the
/// normalized lookup path is derived on demand by
/// [`LookupPathResolver`](super::LookupPathResolver).
#[derive(Debug, Clone)]
pub struct ServerRequest {
    method: Method,
    raw_path: String,
    query: Option<String>,
    query_params: Vec<(String, String)>,
    context_path: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ServerRequest {
    /// Build a request from a method and a request target such as
    /// `/api/beans;v=1?format=json`.
    pub fn new(method: Method, target: &str) -> Self {
        let (raw_path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target.to_string(), None),
        };
        let query_params = query.as_deref().map(parse_query_params).unwrap_or_default();
        debug!(
            method = %method,
            raw_path = %raw_path,
            query_params = query_params.len(),
            "Request created"
        );
        Self {
            method,
            raw_path,
            query,
            query_params,
            context_path: String::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    /// Append a header value. Invalid names or values are logged and skipped.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!(header = %name, "Ignoring invalid request header"),
        }
        self
    }

    #[must_use]
    pub fn with_accept(self, accept: &str) -> Self {
        self.with_header(ACCEPT.as_str(), accept)
    }

    #[must_use]
    pub fn with_context_path(mut self, context_path: &str) -> Self {
        self.context_path = context_path.to_string();
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path portion of the request target, undecoded and with path parameters.
    #[must_use]
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// First decoded value of a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// All values of a header, in arrival order. Non-UTF-8 values are skipped.
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .get_all(name)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parsed `Content-Type`, if present and valid.
    #[must_use]
    pub fn content_type(&self) -> Option<MediaType> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| MediaType::parse(value).ok())
    }
}

/// Decode an `application/x-www-form-urlencoded` query string, keeping order and
/// duplicates.
#[must_use]
pub fn parse_query_params(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_splits_path_and_query() {
        let req = ServerRequest::get("/api/beans;v=1?format=json&tag=a%20b");
        assert_eq!(req.raw_path(), "/api/beans;v=1");
        assert_eq!(req.query(), Some("format=json&tag=a%20b"));
        assert_eq!(req.query_param("format"), Some("json"));
        assert_eq!(req.query_param("tag"), Some("a b"));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_headers_are_case_insensitive_and_multi_valued() {
        let req = ServerRequest::get("/")
            .with_header("Accept", "text/html")
            .with_header("accept", "application/json")
            .with_header("bad header", "x");
        let values: Vec<&str> = req.header_values("ACCEPT").collect();
        assert_eq!(values, vec!["text/html", "application/json"]);
        assert_eq!(req.headers().len(), 2);
    }

    #[test]
    fn test_content_type_parsing() {
        let req = ServerRequest::new(Method::POST, "/pets")
            .with_header("Content-Type", "application/json; charset=UTF-8")
            .with_body(b"{}".to_vec());
        assert_eq!(
            req.content_type().map(|m| m.to_string()),
            Some("application/json;charset=UTF-8".to_string())
        );
        assert_eq!(req.body(), b"{}");
    }
}
