use std::sync::Arc;

use crate::handler::HandlerDescriptor;
use crate::ids::RequestId;
use crate::media::MediaType;
use crate::router::{ParamVec, RoutingKey};

use super::request::ServerRequest;

/// Per-request scratch state shared between resolution and response writing.
///
/// The router records what it matched here; the return value writer reads the
/// producible-types hint back when negotiating.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    lookup_path: Option<String>,
    handler: Option<HandlerDescriptor>,
    matched_key: Option<RoutingKey>,
    best_pattern: Option<String>,
    uri_variables: ParamVec,
    producible_types: Option<Vec<MediaType>>,
}

impl RequestContext {
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            lookup_path: None,
            handler: None,
            matched_key: None,
            best_pattern: None,
            uri_variables: ParamVec::new(),
            producible_types: None,
        }
    }

    /// Context keyed by the request's `x-request-id`, or a fresh id.
    #[must_use]
    pub fn for_request(request: &ServerRequest) -> Self {
        Self::new(RequestId::from_headers(request.headers()))
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn lookup_path(&self) -> Option<&str> {
        self.lookup_path.as_deref()
    }

    pub fn set_lookup_path(&mut self, lookup_path: String) {
        self.lookup_path = Some(lookup_path);
    }

    /// Record the winning match.
    pub fn record_match(
        &mut self,
        handler: HandlerDescriptor,
        matched_key: RoutingKey,
        best_pattern: Option<String>,
        uri_variables: ParamVec,
    ) {
        self.handler = Some(handler);
        self.matched_key = Some(matched_key);
        self.best_pattern = best_pattern;
        self.uri_variables = uri_variables;
    }

    #[must_use]
    pub fn handler(&self) -> Option<&HandlerDescriptor> {
        self.handler.as_ref()
    }

    /// The matched form of the winning key (only the patterns and verbs that
    /// matched this request).
    #[must_use]
    pub fn matched_key(&self) -> Option<&RoutingKey> {
        self.matched_key.as_ref()
    }

    #[must_use]
    pub fn best_pattern(&self) -> Option<&str> {
        self.best_pattern.as_deref()
    }

    #[must_use]
    pub fn uri_variables(&self) -> &ParamVec {
        &self.uri_variables
    }

    /// Value of a URI template variable. Last occurrence wins.
    #[must_use]
    pub fn uri_variable(&self, name: &str) -> Option<&str> {
        self.uri_variables
            .iter()
            .rfind(|(key, _)| Arc::as_ref(key) == name)
            .map(|(_, value)| value.as_str())
    }

    /// Media types the matched mapping declared it produces, if it declared any.
    #[must_use]
    pub fn producible_types(&self) -> Option<&[MediaType]> {
        self.producible_types.as_deref()
    }

    pub fn set_producible_types(&mut self, media_types: Vec<MediaType>) {
        self.producible_types = Some(media_types);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_variable_last_occurrence_wins() {
        let mut ctx = RequestContext::new(RequestId::new());
        let handler = crate::handler::HandlerDescriptor::named(
            "PetController",
            "get",
            crate::handler::ReturnType::Unit,
        );
        let key = RoutingKey::builder(["/pets/{id}"]).build().unwrap();
        let mut vars = ParamVec::new();
        vars.push((Arc::from("id"), "1".to_string()));
        vars.push((Arc::from("id"), "2".to_string()));
        ctx.record_match(handler, key, Some("/pets/{id}".to_string()), vars);
        assert_eq!(ctx.uri_variable("id"), Some("2"));
        assert_eq!(ctx.uri_variable("missing"), None);
        assert_eq!(ctx.best_pattern(), Some("/pets/{id}"));
        assert!(ctx.producible_types().is_none());
    }
}
